//! Exact integer arithmetic used by the rasterization grid.
//!
//! Native integer division truncates towards zero, block and sample indices
//! on the other hand require rounding towards negative infinity.

/// Floor of `dividend / divisor`
///
/// Panics if `divisor` is zero or the quotient does not fit (`i32::MIN / -1`).
pub fn int_floor_div(dividend: i32, divisor: i32) -> i32 {
    assert!(divisor != 0, "division by zero");
    if dividend == 0 {
        return 0;
    }
    let num = dividend.unsigned_abs();
    let den = divisor.unsigned_abs();
    if (dividend < 0) == (divisor < 0) {
        i32::try_from(num / den).unwrap_or_else(|_| panic!("floor division overflow"))
    } else {
        // magnitude is at most 2^31, which negates to i32::MIN
        (num.div_ceil(den) as i32).wrapping_neg()
    }
}

/// Floor of `dividend / divisor` for 64-bit operands
///
/// Panics if `divisor` is zero or the quotient does not fit (`i64::MIN / -1`).
pub fn int_floor_div64(dividend: i64, divisor: i64) -> i64 {
    assert!(divisor != 0, "division by zero");
    if dividend == 0 {
        return 0;
    }
    let num = dividend.unsigned_abs();
    let den = divisor.unsigned_abs();
    if (dividend < 0) == (divisor < 0) {
        i64::try_from(num / den).unwrap_or_else(|_| panic!("floor division overflow"))
    } else {
        (num.div_ceil(den) as i64).wrapping_neg()
    }
}

/// Floor of the Y coordinate where segment `(x1, y1) -> (x2, y2)` crosses the
/// vertical border `x = border_x`.
///
/// Segment must not be vertical and `border_x` is expected to lie within the
/// X range of the segment, which keeps all intermediate products within `i64`
/// for coordinates bounded by the rasterizer coordinate ceiling.
pub fn calculate_y_block_border_cross_point(
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    border_x: i64,
) -> i64 {
    debug_assert!(x1 != x2, "vertical segment has no single crossing");
    y1 + int_floor_div64((border_x - x1) * (y2 - y1), x2 - x1)
}

/// Floor of the X coordinate where segment `(x1, y1) -> (x2, y2)` crosses the
/// horizontal line `y = scan_y`.
pub fn calculate_x_scan_line_cross_point(
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    scan_y: i64,
) -> i64 {
    debug_assert!(y1 != y2, "horizontal segment has no single crossing");
    x1 + int_floor_div64((scan_y - y1) * (x2 - x1), y2 - y1)
}
