//! Block based scan-line rasterization of polygon outlines.
//!
//! Lines are given in integer *algorithm units*. One pixel is split into
//! `subpixels_per_pixel` subpixels per axis, each subpixel is `units_per_subpixel`
//! units wide and is sampled at its center. Pixels are grouped into square blocks
//! of `pixels_per_block` pixels; every block keeps the list of lines passing
//! through it and the winding number at the left border of each of its
//! sub-scan-lines (seed). Seeds are carried from left to right, which allows to
//! classify blocks without any lines as completely inside or outside and to
//! rasterize border blocks without looking at any other block.
use crate::{
    RasterizerError,
    fixed::{
        calculate_x_scan_line_cross_point, calculate_y_block_border_cross_point, int_floor_div64,
    },
};

pub const MIN_UNITS_PER_SUBPIXEL: u32 = 4;
pub const MAX_UNITS_PER_SUBPIXEL: u32 = 1024 * 1024;
pub const DEFAULT_UNITS_PER_SUBPIXEL: u32 = 256;

pub const MIN_SUBPIXELS_PER_PIXEL: u32 = 1;
pub const MAX_SUBPIXELS_PER_PIXEL: u32 = 32;

pub const MIN_PIXELS_PER_BLOCK: u32 = 4;
pub const MAX_PIXELS_PER_BLOCK: u32 = 1024;
pub const DEFAULT_PIXELS_PER_BLOCK: u32 = 32;

pub const MIN_BLOCK_COUNT: u32 = 1;
pub const MAX_BLOCK_COUNT: u32 = 1024 * 1024;

/// Hard ceiling for the absolute value of any line coordinate
pub const MAX_COORDINATE: i64 = 512 * 1024 * 1024;
/// Maximum number of lines a single algorithm instance accepts
pub const MAX_LINE_COUNT: usize = 512 * 1024 * 1024;

/// Classification of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    /// Block has not been scanned yet
    #[default]
    Unknown,
    /// Block contains no lines and all its samples are inside
    CompleteInside,
    /// Block contains no lines and all its samples are outside
    CompleteOutside,
    /// Block needs per sample rasterization
    Border,
    /// Requested position is not covered by the block grid
    OutsideRange,
}

/// Directed line segment in algorithm units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLine {
    pub index: u32,
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub metadata: i32,
}

impl RasterLine {
    /// Contribution to the winding number when crossed from left to right
    #[inline]
    pub fn winding(&self) -> i32 {
        if self.y1 > self.y2 { 1 } else { -1 }
    }

    /// Floor of the X position where the line crosses scan line `y` and its winding.
    ///
    /// End points never lie on a scan line, so a strict test is sufficient.
    #[inline]
    pub fn scan_line_crossing(&self, y: i64) -> Option<(i64, i32)> {
        let (y1, y2) = (self.y1 as i64, self.y2 as i64);
        if (y1 < y && y < y2) || (y2 < y && y < y1) {
            let x = calculate_x_scan_line_cross_point(
                self.x1 as i64,
                y1,
                self.x2 as i64,
                y2,
                y,
            );
            Some((x, self.winding()))
        } else {
            None
        }
    }
}

/// Scaling parameters of the block grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridParameters {
    /// Must be even and within `[4, 1048576]`
    pub units_per_subpixel: u32,
    pub subpixels_per_pixel_x: u32,
    pub subpixels_per_pixel_y: u32,
    pub pixels_per_block: u32,
    pub block_count_x: u32,
    pub block_count_y: u32,
}

impl Default for GridParameters {
    fn default() -> Self {
        Self {
            units_per_subpixel: DEFAULT_UNITS_PER_SUBPIXEL,
            subpixels_per_pixel_x: 1,
            subpixels_per_pixel_y: 1,
            pixels_per_block: DEFAULT_PIXELS_PER_BLOCK,
            block_count_x: 1,
            block_count_y: 1,
        }
    }
}

impl GridParameters {
    pub fn validate(&self) -> Result<(), RasterizerError> {
        if !(MIN_UNITS_PER_SUBPIXEL..=MAX_UNITS_PER_SUBPIXEL).contains(&self.units_per_subpixel)
            || self.units_per_subpixel % 2 != 0
        {
            return Err(RasterizerError::InvalidUnitsPerSubpixel);
        }
        let subpixels = MIN_SUBPIXELS_PER_PIXEL..=MAX_SUBPIXELS_PER_PIXEL;
        if !subpixels.contains(&self.subpixels_per_pixel_x)
            || !subpixels.contains(&self.subpixels_per_pixel_y)
        {
            return Err(RasterizerError::InvalidSubpixelsPerPixel);
        }
        if !(MIN_PIXELS_PER_BLOCK..=MAX_PIXELS_PER_BLOCK).contains(&self.pixels_per_block) {
            return Err(RasterizerError::InvalidPixelsPerBlock);
        }
        let blocks = MIN_BLOCK_COUNT..=MAX_BLOCK_COUNT;
        if !blocks.contains(&self.block_count_x) || !blocks.contains(&self.block_count_y) {
            return Err(RasterizerError::InvalidBlockCount);
        }
        let (total_x, total_y) = self.total_size_in_units();
        if total_x > MAX_COORDINATE || total_y > MAX_COORDINATE {
            return Err(RasterizerError::LineCoordinateOverflow);
        }
        Ok(())
    }

    pub fn units_per_pixel_x(&self) -> u64 {
        self.units_per_subpixel as u64 * self.subpixels_per_pixel_x as u64
    }

    pub fn units_per_pixel_y(&self) -> u64 {
        self.units_per_subpixel as u64 * self.subpixels_per_pixel_y as u64
    }

    pub fn units_per_block_x(&self) -> i64 {
        (self.units_per_pixel_x() * self.pixels_per_block as u64) as i64
    }

    pub fn units_per_block_y(&self) -> i64 {
        (self.units_per_pixel_y() * self.pixels_per_block as u64) as i64
    }

    /// Size of the area covered by the block grid in units
    pub fn total_size_in_units(&self) -> (i64, i64) {
        (
            self.units_per_block_x() * self.block_count_x as i64,
            self.units_per_block_y() * self.block_count_y as i64,
        )
    }

    /// Number of sub-scan-lines per block
    pub fn scan_lines_per_block(&self) -> usize {
        self.subpixels_per_pixel_y as usize * self.pixels_per_block as usize
    }

    /// Number of samples that fall into one pixel
    pub fn samples_per_pixel(&self) -> u32 {
        self.subpixels_per_pixel_x * self.subpixels_per_pixel_y
    }
}

#[derive(Debug, Clone, Copy)]
struct LineListItem {
    line: u32,
    next: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default)]
struct RasterBlock {
    first_item: Option<u32>,
    line_count: u32,
    block_type: BlockType,
}

/// Walks a singly linked line list stored in the item arena
struct LineListIter<'a> {
    items: &'a [LineListItem],
    lines: &'a [RasterLine],
    current: Option<u32>,
}

impl<'a> Iterator for LineListIter<'a> {
    type Item = &'a RasterLine;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.items[self.current? as usize];
        self.current = item.next;
        Some(&self.lines[item.line as usize])
    }
}

fn line_list<'a>(
    items: &'a [LineListItem],
    lines: &'a [RasterLine],
    head: Option<u32>,
) -> LineListIter<'a> {
    LineListIter {
        items,
        lines,
        current: head,
    }
}

/// Rasterization state of one polygon set (one Z-sample).
///
/// Usage is strictly ordered: add all lines with [`add_line`], call
/// [`build_blocks`], then [`build_block_scan_lines`] for every block, row by
/// row from left to right, after which blocks can be queried and rasterized.
///
/// [`add_line`]: RasterizationAlgorithm::add_line
/// [`build_blocks`]: RasterizationAlgorithm::build_blocks
/// [`build_block_scan_lines`]: RasterizationAlgorithm::build_block_scan_lines
#[derive(Debug, Clone)]
pub struct RasterizationAlgorithm {
    params: GridParameters,
    units_per_subpixel: i64,
    units_per_half_subpixel: i64,
    units_per_block_x: i64,
    units_per_block_y: i64,
    total_size_x: i64,
    total_size_y: i64,
    scan_lines_per_block: usize,

    lines: Vec<RasterLine>,
    // line list arena, blocks and margin hold heads of singly linked lists
    items: Vec<LineListItem>,
    item_capacity: usize,
    blocks: Vec<RasterBlock>,
    // lines left of `x = 0`, one list per block row
    margin: Vec<Option<u32>>,
    seeds: Vec<i32>,
    // next block column to be scanned, per block row
    scan_cursor: Vec<u32>,

    disregarded_line_count: u32,
    negative_half_plane_line_count: u32,
}

impl RasterizationAlgorithm {
    pub fn new(
        params: GridParameters,
        expected_line_count: usize,
    ) -> Result<Self, RasterizerError> {
        params.validate()?;
        let (total_size_x, total_size_y) = params.total_size_in_units();
        let block_count = params.block_count_x as usize * params.block_count_y as usize;
        let scan_lines_per_block = params.scan_lines_per_block();
        Ok(Self {
            params,
            units_per_subpixel: params.units_per_subpixel as i64,
            units_per_half_subpixel: params.units_per_subpixel as i64 / 2,
            units_per_block_x: params.units_per_block_x(),
            units_per_block_y: params.units_per_block_y(),
            total_size_x,
            total_size_y,
            scan_lines_per_block,
            lines: Vec::with_capacity(expected_line_count.min(MAX_LINE_COUNT)),
            items: Vec::new(),
            item_capacity: 0,
            blocks: vec![RasterBlock::default(); block_count],
            margin: vec![None; params.block_count_y as usize],
            seeds: vec![0; block_count * scan_lines_per_block],
            scan_cursor: vec![0; params.block_count_y as usize],
            disregarded_line_count: 0,
            negative_half_plane_line_count: 0,
        })
    }

    pub fn params(&self) -> &GridParameters {
        &self.params
    }

    /// Lines accepted so far
    pub fn lines(&self) -> &[RasterLine] {
        &self.lines
    }

    /// Number of lines that were ignored as irrelevant
    pub fn disregarded_line_count(&self) -> u32 {
        self.disregarded_line_count
    }

    /// Number of accepted lines touching `x <= 0`
    pub fn negative_half_plane_line_count(&self) -> u32 {
        self.negative_half_plane_line_count
    }

    /// Size of the covered area in units
    pub fn total_size_in_units(&self) -> (i64, i64) {
        (self.total_size_x, self.total_size_y)
    }

    #[inline]
    fn is_on_sample_grid(&self, units: i32) -> bool {
        units as i64 % self.units_per_half_subpixel == 0
    }

    #[inline]
    fn nudge(&self, units: i32) -> i32 {
        if self.is_on_sample_grid(units) {
            units + 1
        } else {
            units
        }
    }

    /// Add directed line `(x1, y1) -> (x2, y2)` given in units.
    ///
    /// Lines with zero length, lines reaching beyond the covered area and lines
    /// below the X axis are disregarded (only counted). Coordinates exceeding
    /// [`MAX_COORDINATE`] are an error.
    pub fn add_line(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        metadata: i32,
    ) -> Result<(), RasterizerError> {
        let has_zero_length = x1 == x2 && y1 == y2;
        let is_outside_x = x1 as i64 >= self.total_size_x || x2 as i64 >= self.total_size_x;
        let is_outside_y = y1 as i64 >= self.total_size_y || y2 as i64 >= self.total_size_y;
        let is_total_negative_y = y1 <= 0 && y2 <= 0;
        let touches_zero_x = (x1 <= 0 && x2 >= 0) || (x1 >= 0 && x2 <= 0);
        if has_zero_length
            || is_outside_x
            || is_outside_y
            || (is_total_negative_y && !touches_zero_x)
        {
            self.disregarded_line_count += 1;
            return Ok(());
        }

        if [x1, y1, x2, y2]
            .iter()
            .any(|units| (*units as i64).abs() > MAX_COORDINATE)
        {
            return Err(RasterizerError::LineCoordinateOverflow);
        }

        let (x1, y1, x2, y2) = (self.nudge(x1), self.nudge(y1), self.nudge(x2), self.nudge(y2));
        if x1 == x2 && y1 == y2 {
            // collapsed onto a single point by the nudge
            self.disregarded_line_count += 1;
            return Ok(());
        }
        if x1 <= 0 || x2 <= 0 {
            self.negative_half_plane_line_count += 1;
        }
        self.add_line_internal(x1, y1, x2, y2, metadata)
    }

    fn add_line_internal(
        &mut self,
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        metadata: i32,
    ) -> Result<(), RasterizerError> {
        if self.lines.len() >= MAX_LINE_COUNT {
            return Err(RasterizerError::TooManyLinesInLayer);
        }
        self.lines.push(RasterLine {
            index: self.lines.len() as u32,
            x1,
            y1,
            x2,
            y2,
            metadata,
        });

        // upper bound of blocks touched by the line
        let delta_x = (x1 as i64 - x2 as i64).unsigned_abs();
        let delta_y = (y1 as i64 - y2 as i64).unsigned_abs();
        let blocks_x = delta_x / self.units_per_block_x as u64 + 1;
        let blocks_y = delta_y / self.units_per_block_y as u64 + 1;
        self.item_capacity += (blocks_x + blocks_y + 1) as usize;
        Ok(())
    }

    /// Drop all block memberships, seeds and classifications
    pub fn reset_blocks(&mut self) {
        self.items.clear();
        self.blocks.fill(RasterBlock::default());
        self.margin.fill(None);
        self.seeds.fill(0);
        self.scan_cursor.fill(0);
    }

    /// Assign every line to all blocks it passes through
    pub fn build_blocks(&mut self) {
        let _span = tracing::debug_span!("[build_blocks]", lines = self.lines.len()).entered();
        self.reset_blocks();
        self.items.reserve(self.item_capacity);

        for index in 0..self.lines.len() {
            let RasterLine { x1, y1, x2, y2, .. } = self.lines[index];
            let (x1, y1, x2, y2) = (x1 as i64, y1 as i64, x2 as i64, y2 as i64);
            if x1 == x2 {
                let block_x = int_floor_div64(x1, self.units_per_block_x);
                let block_y1 = int_floor_div64(y1, self.units_per_block_y);
                let block_y2 = int_floor_div64(y2, self.units_per_block_y);
                self.build_blocks_vertical(index, block_x, block_y1, block_y2);
            } else if y1 == y2 {
                let block_y = int_floor_div64(y1, self.units_per_block_y);
                let block_x1 = int_floor_div64(x1, self.units_per_block_x);
                let block_x2 = int_floor_div64(x2, self.units_per_block_x);
                self.build_blocks_horizontal(index, block_y, block_x1, block_x2);
            } else {
                self.build_blocks_rational(index);
            }
        }

        if self.items.len() > self.item_capacity {
            tracing::debug!(
                "[build_blocks] line item arena grew beyond estimate {} > {}",
                self.items.len(),
                self.item_capacity
            );
        }
        if self.disregarded_line_count > 0 {
            tracing::debug!(
                "[build_blocks] disregarded lines: {}",
                self.disregarded_line_count
            );
        }
    }

    /// Add line to blocks `block_y1..=block_y2` of column `block_x`,
    /// negative columns are collected in the margin.
    fn build_blocks_vertical(
        &mut self,
        line: usize,
        block_x: i64,
        block_y1: i64,
        block_y2: i64,
    ) {
        let (block_y1, block_y2) = if block_y1 > block_y2 {
            (block_y2, block_y1)
        } else {
            (block_y1, block_y2)
        };
        let block_count_y = self.params.block_count_y as i64;
        if block_y2 < 0 || block_y1 >= block_count_y || block_x >= self.params.block_count_x as i64
        {
            return;
        }
        for block_y in block_y1.max(0)..=block_y2.min(block_count_y - 1) {
            if block_x < 0 {
                self.add_line_to_margin(line, block_y as usize);
            } else {
                let block = self.block_index(block_x as u32, block_y as u32);
                self.add_line_to_block(line, block);
            }
        }
    }

    /// Add line to blocks `block_x1..=block_x2` of row `block_y`.
    ///
    /// Horizontal lines never cross a scan line, so the margin is skipped.
    fn build_blocks_horizontal(
        &mut self,
        line: usize,
        block_y: i64,
        block_x1: i64,
        block_x2: i64,
    ) {
        let (block_x1, block_x2) = if block_x1 > block_x2 {
            (block_x2, block_x1)
        } else {
            (block_x1, block_x2)
        };
        let block_count_x = self.params.block_count_x as i64;
        if block_x2 < 0
            || block_x1 >= block_count_x
            || block_y < 0
            || block_y >= self.params.block_count_y as i64
        {
            return;
        }
        for block_x in block_x1.max(0)..=block_x2.min(block_count_x - 1) {
            let block = self.block_index(block_x as u32, block_y as u32);
            self.add_line_to_block(line, block);
        }
    }

    /// Split a general line at vertical block borders and treat each piece as
    /// vertical within its column.
    fn build_blocks_rational(&mut self, line: usize) {
        let RasterLine { x1, y1, x2, y2, .. } = self.lines[line];
        let (x1, y1, x2, y2) = if x1 > x2 {
            (x2 as i64, y2 as i64, x1 as i64, y1 as i64)
        } else {
            (x1 as i64, y1 as i64, x2 as i64, y2 as i64)
        };
        debug_assert!(x2 > x1 && y1 != y2, "line is not rational");

        let ubx = self.units_per_block_x;
        let uby = self.units_per_block_y;
        let block_x1 = int_floor_div64(x1, ubx);
        let block_x2 = int_floor_div64(x2, ubx);
        if block_x1 >= self.params.block_count_x as i64 {
            return;
        }
        if block_x1 == block_x2 || block_x2 < 0 {
            let column = if block_x2 < 0 { -1 } else { block_x1 };
            self.build_blocks_vertical(
                line,
                column,
                int_floor_div64(y1, uby),
                int_floor_div64(y2, uby),
            );
            return;
        }

        // column -1 stands for everything left of the grid
        let first = block_x1.max(-1);
        let last = block_x2.min(self.params.block_count_x as i64 - 1);
        for block_x in first..=last {
            let start_x = if block_x < 0 { x1 } else { (block_x * ubx).max(x1) };
            let end_x = if block_x < 0 { 0 } else { ((block_x + 1) * ubx).min(x2) };
            let start_y = if start_x == x1 {
                y1
            } else {
                calculate_y_block_border_cross_point(x1, y1, x2, y2, start_x)
            };
            let end_y = if end_x == x2 {
                y2
            } else {
                calculate_y_block_border_cross_point(x1, y1, x2, y2, end_x)
            };
            self.build_blocks_vertical(
                line,
                block_x,
                int_floor_div64(start_y, uby),
                int_floor_div64(end_y, uby),
            );
        }
    }

    fn push_item(&mut self, line: usize, next: Option<u32>) -> u32 {
        let item = self.items.len();
        assert!(item < u32::MAX as usize, "line item arena overflow");
        self.items.push(LineListItem {
            line: line as u32,
            next,
        });
        item as u32
    }

    fn add_line_to_block(&mut self, line: usize, block: usize) {
        let next = self.blocks[block].first_item;
        let item = self.push_item(line, next);
        let block = &mut self.blocks[block];
        block.first_item = Some(item);
        block.line_count += 1;
    }

    fn add_line_to_margin(&mut self, line: usize, block_y: usize) {
        let next = self.margin[block_y];
        let item = self.push_item(line, next);
        self.margin[block_y] = Some(item);
    }

    #[inline]
    fn block_index(&self, block_x: u32, block_y: u32) -> usize {
        block_x as usize + block_y as usize * self.params.block_count_x as usize
    }

    fn check_block_index(&self, block_x: u32, block_y: u32) -> Result<usize, RasterizerError> {
        if block_x < self.params.block_count_x && block_y < self.params.block_count_y {
            Ok(self.block_index(block_x, block_y))
        } else {
            Err(RasterizerError::InvalidBlockIndex)
        }
    }

    /// Y coordinate of sub-scan-line `index` of block row `block_y`
    #[inline]
    fn scan_line_y(&self, block_y: u32, index: usize) -> i64 {
        block_y as i64 * self.units_per_block_y
            + index as i64 * self.units_per_subpixel
            + self.units_per_half_subpixel
    }

    /// Compute crossings of all sub-scan-lines of the block, derive its
    /// classification and pass the resulting winding numbers on as seeds of the
    /// block to the right.
    ///
    /// Columns of a row must be processed in increasing order.
    pub fn build_block_scan_lines(
        &mut self,
        block_x: u32,
        block_y: u32,
    ) -> Result<(), RasterizerError> {
        let block = self.check_block_index(block_x, block_y)?;
        if self.scan_cursor[block_y as usize] != block_x {
            return Err(RasterizerError::BlockScanOrder);
        }
        let count = self.scan_lines_per_block;
        let offset = block * count;

        if block_x == 0 {
            let head = self.margin[block_y as usize];
            for index in 0..count {
                let y = self.scan_line_y(block_y, index);
                self.seeds[offset + index] = line_list(&self.items, &self.lines, head)
                    .filter_map(|line| line.scan_line_crossing(y))
                    .filter(|(x, _)| *x < 0)
                    .map(|(_, winding)| winding)
                    .sum();
            }
        }

        let left = block_x as i64 * self.units_per_block_x;
        let right = left + self.units_per_block_x;
        let head = self.blocks[block].first_item;
        let has_right = block_x + 1 < self.params.block_count_x;
        for index in 0..count {
            let y = self.scan_line_y(block_y, index);
            let winding = self.seeds[offset + index]
                + line_list(&self.items, &self.lines, head)
                    .filter_map(|line| line.scan_line_crossing(y))
                    .filter(|(x, _)| (left..right).contains(x))
                    .map(|(_, winding)| winding)
                    .sum::<i32>();
            if has_right {
                self.seeds[offset + count + index] = winding;
            }
        }

        let seeds = &self.seeds[offset..offset + count];
        let block = &mut self.blocks[block];
        block.block_type = if block.first_item.is_some() {
            BlockType::Border
        } else if seeds.iter().all(|seed| *seed != 0) {
            BlockType::CompleteInside
        } else if seeds.iter().all(|seed| *seed == 0) {
            BlockType::CompleteOutside
        } else {
            BlockType::Border
        };
        self.scan_cursor[block_y as usize] += 1;
        Ok(())
    }

    /// Build scan lines of all blocks in the required order
    pub fn build_all_block_scan_lines(&mut self) -> Result<(), RasterizerError> {
        for block_y in 0..self.params.block_count_y {
            for block_x in self.scan_cursor[block_y as usize]..self.params.block_count_x {
                self.build_block_scan_lines(block_x, block_y)?;
            }
        }
        Ok(())
    }

    /// Number of lines passing through the block
    pub fn block_line_count(&self, block_x: u32, block_y: u32) -> Option<u32> {
        let block = self.check_block_index(block_x, block_y).ok()?;
        Some(self.blocks[block].line_count)
    }

    /// Lines passing through the block
    pub fn block_lines(
        &self,
        block_x: u32,
        block_y: u32,
    ) -> impl Iterator<Item = &RasterLine> + '_ {
        let head = self
            .check_block_index(block_x, block_y)
            .ok()
            .and_then(|block| self.blocks[block].first_item);
        line_list(&self.items, &self.lines, head)
    }

    /// Winding numbers at the left border of each sub-scan-line of the block
    pub fn scan_seed_values(&self, block_x: u32, block_y: u32) -> Option<&[i32]> {
        let block = self.check_block_index(block_x, block_y).ok()?;
        let offset = block * self.scan_lines_per_block;
        Some(&self.seeds[offset..offset + self.scan_lines_per_block])
    }

    /// Classification of the block containing the position given in units
    pub fn block_info_at_xy(&self, x: i32, y: i32) -> BlockType {
        if x < 0 || y < 0 {
            return BlockType::OutsideRange;
        }
        self.block_info_i64(
            x as i64 / self.units_per_block_x,
            y as i64 / self.units_per_block_y,
        )
    }

    /// Classification of the block
    pub fn block_info(&self, block_x: i32, block_y: i32) -> BlockType {
        self.block_info_i64(block_x as i64, block_y as i64)
    }

    fn block_info_i64(&self, block_x: i64, block_y: i64) -> BlockType {
        if block_x < 0
            || block_y < 0
            || block_x >= self.params.block_count_x as i64
            || block_y >= self.params.block_count_y as i64
        {
            return BlockType::OutsideRange;
        }
        let block = &self.blocks[self.block_index(block_x as u32, block_y as u32)];
        if block.first_item.is_some() {
            BlockType::Border
        } else {
            block.block_type
        }
    }

    /// Add per pixel count of inside samples of the block to the `buffer`.
    ///
    /// `buffer` holds `pixels_per_block * pixels_per_block` values in row major
    /// order, each pixel receives at most `subpixels_per_pixel_x * subpixels_per_pixel_y`.
    pub fn add_block_to_buffer(
        &self,
        block_x: u32,
        block_y: u32,
        buffer: &mut [u32],
    ) -> Result<(), RasterizerError> {
        let block = self.check_block_index(block_x, block_y)?;
        let pixels_per_block = self.params.pixels_per_block as usize;
        if buffer.len() != pixels_per_block * pixels_per_block {
            return Err(RasterizerError::InvalidBufferSize);
        }
        if self.scan_cursor[block_y as usize] <= block_x {
            return Err(RasterizerError::BlockScanOrder);
        }

        let head = self.blocks[block].first_item;
        match self.blocks[block].block_type {
            BlockType::CompleteInside => {
                let samples = self.params.samples_per_pixel();
                buffer.iter_mut().for_each(|value| *value += samples);
                return Ok(());
            }
            BlockType::Border => {}
            _ => return Ok(()),
        }

        let sub_x = self.params.subpixels_per_pixel_x as usize;
        let sub_y = self.params.subpixels_per_pixel_y as usize;
        let left = block_x as i64 * self.units_per_block_x;
        let right = left + self.units_per_block_x;
        let offset = block * self.scan_lines_per_block;
        let mut crossings: Vec<(i64, i32)> = Vec::new();
        for index in 0..self.scan_lines_per_block {
            let y = self.scan_line_y(block_y, index);
            crossings.clear();
            crossings.extend(
                line_list(&self.items, &self.lines, head)
                    .filter_map(|line| line.scan_line_crossing(y))
                    .filter(|(x, _)| (left..right).contains(x)),
            );
            crossings.sort_unstable_by_key(|(x, _)| *x);

            let row = (index / sub_y) * pixels_per_block;
            let mut winding = self.seeds[offset + index];
            let mut crossings = crossings.iter().peekable();
            for sample in 0..sub_x * pixels_per_block {
                let x = left
                    + sample as i64 * self.units_per_subpixel
                    + self.units_per_half_subpixel;
                while let Some((_, delta)) = crossings.next_if(|(cross_x, _)| *cross_x < x) {
                    winding += delta;
                }
                if winding != 0 {
                    buffer[row + sample / sub_x] += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 16 units per pixel, 4 pixels (64 units) per block
    fn grid(block_count_x: u32, block_count_y: u32) -> GridParameters {
        GridParameters {
            units_per_subpixel: 16,
            subpixels_per_pixel_x: 1,
            subpixels_per_pixel_y: 1,
            pixels_per_block: 4,
            block_count_x,
            block_count_y,
        }
    }

    fn add_polygon(
        algorithm: &mut RasterizationAlgorithm,
        points: &[(i32, i32)],
    ) -> Result<(), RasterizerError> {
        for (index, (x1, y1)) in points.iter().enumerate() {
            let (x2, y2) = points[(index + 1) % points.len()];
            algorithm.add_line(*x1, *y1, x2, y2, index as i32)?;
        }
        Ok(())
    }

    fn build(algorithm: &mut RasterizationAlgorithm) -> Result<(), RasterizerError> {
        algorithm.build_blocks();
        algorithm.build_all_block_scan_lines()
    }

    /// Inside sample count of every pixel of the grid
    fn coverage(algorithm: &RasterizationAlgorithm) -> Result<Vec<u32>, RasterizerError> {
        let params = *algorithm.params();
        let pixels_per_block = params.pixels_per_block as usize;
        let width = pixels_per_block * params.block_count_x as usize;
        let height = pixels_per_block * params.block_count_y as usize;
        let mut image = vec![0; width * height];
        let mut buffer = vec![0; pixels_per_block * pixels_per_block];
        for block_y in 0..params.block_count_y {
            for block_x in 0..params.block_count_x {
                buffer.fill(0);
                algorithm.add_block_to_buffer(block_x, block_y, &mut buffer)?;
                for (index, value) in buffer.iter().enumerate() {
                    let x = block_x as usize * pixels_per_block + index % pixels_per_block;
                    let y = block_y as usize * pixels_per_block + index / pixels_per_block;
                    image[x + y * width] = *value;
                }
            }
        }
        Ok(image)
    }

    fn classification(algorithm: &RasterizationAlgorithm) -> Vec<BlockType> {
        let params = algorithm.params();
        let mut result = Vec::new();
        for block_y in 0..params.block_count_y as i32 {
            for block_x in 0..params.block_count_x as i32 {
                result.push(algorithm.block_info(block_x, block_y));
            }
        }
        result
    }

    #[test]
    fn test_parameter_validation() {
        let check = |params: GridParameters| RasterizationAlgorithm::new(params, 0).err();
        assert!(check(grid(1, 1)).is_none());
        assert!(matches!(
            check(GridParameters {
                units_per_subpixel: 17,
                ..grid(1, 1)
            }),
            Some(RasterizerError::InvalidUnitsPerSubpixel)
        ));
        assert!(matches!(
            check(GridParameters {
                units_per_subpixel: 2,
                ..grid(1, 1)
            }),
            Some(RasterizerError::InvalidUnitsPerSubpixel)
        ));
        assert!(matches!(
            check(GridParameters {
                units_per_subpixel: 2 * MAX_UNITS_PER_SUBPIXEL,
                ..grid(1, 1)
            }),
            Some(RasterizerError::InvalidUnitsPerSubpixel)
        ));
        assert!(matches!(
            check(GridParameters {
                subpixels_per_pixel_x: 0,
                ..grid(1, 1)
            }),
            Some(RasterizerError::InvalidSubpixelsPerPixel)
        ));
        assert!(matches!(
            check(GridParameters {
                subpixels_per_pixel_y: 33,
                ..grid(1, 1)
            }),
            Some(RasterizerError::InvalidSubpixelsPerPixel)
        ));
        assert!(matches!(
            check(GridParameters {
                pixels_per_block: 3,
                ..grid(1, 1)
            }),
            Some(RasterizerError::InvalidPixelsPerBlock)
        ));
        assert!(matches!(
            check(grid(0, 1)),
            Some(RasterizerError::InvalidBlockCount)
        ));
        assert!(matches!(
            check(grid(1, MAX_BLOCK_COUNT + 1)),
            Some(RasterizerError::InvalidBlockCount)
        ));

        // 32 * 32 * 2^20 units per block are beyond the coordinate ceiling
        let coarse = GridParameters {
            units_per_subpixel: MAX_UNITS_PER_SUBPIXEL,
            subpixels_per_pixel_x: 32,
            subpixels_per_pixel_y: 1,
            pixels_per_block: 32,
            block_count_x: 1,
            block_count_y: 1,
        };
        assert!(matches!(
            check(coarse),
            Some(RasterizerError::LineCoordinateOverflow)
        ));
        assert!(check(GridParameters {
            subpixels_per_pixel_x: 1,
            ..coarse
        })
        .is_none());
        // 512 pixels of 2^20 units reach the ceiling exactly
        assert!(check(GridParameters {
            subpixels_per_pixel_x: 1,
            pixels_per_block: 512,
            ..coarse
        })
        .is_none());
        assert!(matches!(
            check(GridParameters {
                subpixels_per_pixel_x: 1,
                pixels_per_block: 512,
                block_count_y: 2,
                ..coarse
            }),
            Some(RasterizerError::LineCoordinateOverflow)
        ));
    }

    #[test]
    fn test_zero_length_line() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(2, 2), 1)?;
        algorithm.add_line(10, 10, 10, 10, 0)?;
        assert_eq!(algorithm.disregarded_line_count(), 1);
        assert!(algorithm.lines().is_empty());
        build(&mut algorithm)?;
        for block_y in 0..2 {
            for block_x in 0..2 {
                assert_eq!(algorithm.block_line_count(block_x, block_y), Some(0));
                assert_eq!(algorithm.block_lines(block_x, block_y).count(), 0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_line_rejection() -> Result<(), RasterizerError> {
        // covered area is 128 x 128 units
        let mut algorithm = RasterizationAlgorithm::new(grid(2, 2), 8)?;
        // beyond the right border
        algorithm.add_line(10, 10, 200, 20, 0)?;
        // below the X axis
        algorithm.add_line(10, -5, 20, -1, 0)?;
        // touches the bottom border
        algorithm.add_line(10, 10, 20, 128, 0)?;
        assert_eq!(algorithm.disregarded_line_count(), 3);

        // below the X axis but crossing x = 0 is kept
        algorithm.add_line(-5, -5, 5, -1, 0)?;
        // left of the grid is kept
        algorithm.add_line(-50, 10, -40, 100, 0)?;
        assert_eq!(algorithm.disregarded_line_count(), 3);
        assert_eq!(algorithm.lines().len(), 2);
        assert_eq!(algorithm.negative_half_plane_line_count(), 2);

        assert!(matches!(
            algorithm.add_line(-600_000_000, 10, 20, 30, 0),
            Err(RasterizerError::LineCoordinateOverflow)
        ));
        Ok(())
    }

    #[test]
    fn test_sample_grid_nudge() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(2, 2), 2)?;
        algorithm.add_line(8, 16, 40, 33, 7)?;
        let line = algorithm.lines()[0];
        assert_eq!((line.x1, line.y1, line.x2, line.y2), (9, 17, 41, 33));
        assert_eq!(line.metadata, 7);
        assert_eq!(line.index, 0);

        // collapses into a point after adjustment
        algorithm.add_line(16, 16, 17, 17, 0)?;
        assert_eq!(algorithm.disregarded_line_count(), 1);
        assert_eq!(algorithm.lines().len(), 1);
        Ok(())
    }

    #[test]
    fn test_square_classification() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(4, 4), 4)?;
        add_polygon(&mut algorithm, &[(70, 70), (230, 70), (230, 230), (70, 230)])?;
        build(&mut algorithm)?;

        use BlockType::*;
        #[rustfmt::skip]
        let expected = vec![
            CompleteOutside, CompleteOutside, CompleteOutside, CompleteOutside,
            CompleteOutside, Border,          Border,          Border,
            CompleteOutside, Border,          CompleteInside,  Border,
            CompleteOutside, Border,          Border,          Border,
        ];
        assert_eq!(classification(&algorithm), expected);
        assert_eq!(algorithm.block_info(4, 0), OutsideRange);
        assert_eq!(algorithm.block_info(0, -1), OutsideRange);
        assert_eq!(algorithm.block_info_at_xy(150, 150), CompleteInside);
        assert_eq!(algorithm.block_info_at_xy(-1, 150), OutsideRange);
        assert_eq!(algorithm.scan_seed_values(2, 2), Some(&[1, 1, 1, 1][..]));

        let mut buffer = vec![0; 16];
        algorithm.add_block_to_buffer(3, 3, &mut buffer)?;
        #[rustfmt::skip]
        assert_eq!(buffer, vec![
            1, 1, 0, 0,
            1, 1, 0, 0,
            0, 0, 0, 0,
            0, 0, 0, 0,
        ]);

        // pixels 4..=13 have their centers inside of the square
        let image = coverage(&algorithm)?;
        for y in 0..16 {
            for x in 0..16 {
                let inside = (4..=13).contains(&x) && (4..=13).contains(&y);
                assert_eq!(image[x + y * 16], inside as u32, "pixel {x} {y}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_orientation_independent() -> Result<(), RasterizerError> {
        let mut ccw = RasterizationAlgorithm::new(grid(4, 4), 4)?;
        add_polygon(&mut ccw, &[(70, 70), (230, 70), (230, 230), (70, 230)])?;
        build(&mut ccw)?;
        let mut cw = RasterizationAlgorithm::new(grid(4, 4), 4)?;
        add_polygon(&mut cw, &[(70, 70), (70, 230), (230, 230), (230, 70)])?;
        build(&mut cw)?;
        assert_eq!(coverage(&ccw)?, coverage(&cw)?);
        assert_eq!(cw.scan_seed_values(2, 2), Some(&[-1, -1, -1, -1][..]));
        Ok(())
    }

    #[test]
    fn test_build_blocks_idempotent() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(4, 4), 4)?;
        add_polygon(&mut algorithm, &[(30, 20), (240, 90), (120, 250)])?;
        build(&mut algorithm)?;
        let first = classification(&algorithm);
        let first_coverage = coverage(&algorithm)?;

        algorithm.reset_blocks();
        assert!(
            classification(&algorithm)
                .iter()
                .all(|block| *block == BlockType::Unknown)
        );
        build(&mut algorithm)?;
        assert_eq!(classification(&algorithm), first);
        assert_eq!(coverage(&algorithm)?, first_coverage);
        Ok(())
    }

    #[test]
    fn test_scan_order() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(2, 2), 4)?;
        add_polygon(&mut algorithm, &[(10, 10), (100, 10), (100, 100)])?;
        algorithm.build_blocks();
        let mut buffer = vec![0; 16];
        assert!(matches!(
            algorithm.build_block_scan_lines(1, 0),
            Err(RasterizerError::BlockScanOrder)
        ));
        assert!(matches!(
            algorithm.add_block_to_buffer(0, 0, &mut buffer),
            Err(RasterizerError::BlockScanOrder)
        ));
        assert!(matches!(
            algorithm.build_block_scan_lines(2, 0),
            Err(RasterizerError::InvalidBlockIndex)
        ));
        algorithm.build_block_scan_lines(0, 0)?;
        algorithm.build_block_scan_lines(1, 0)?;
        algorithm.add_block_to_buffer(1, 0, &mut buffer)?;
        assert!(matches!(
            algorithm.add_block_to_buffer(1, 0, &mut buffer[..15]),
            Err(RasterizerError::InvalidBufferSize)
        ));
        Ok(())
    }

    #[test]
    fn test_figure_eight_nonzero() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(4, 4), 4)?;
        // bow tie, the two lobes have opposite winding
        add_polygon(&mut algorithm, &[(66, 66), (242, 242), (242, 66), (66, 242)])?;
        build(&mut algorithm)?;
        let image = coverage(&algorithm)?;
        let at = |x: usize, y: usize| image[x + y * 16];
        // left and right lobes
        assert_eq!(at(5, 9), 1);
        assert_eq!(at(12, 9), 1);
        // top and bottom wedges are not enclosed
        assert_eq!(at(9, 5), 0);
        assert_eq!(at(9, 13), 0);
        Ok(())
    }

    #[test]
    fn test_overlapping_polygons() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(4, 4), 8)?;
        add_polygon(&mut algorithm, &[(20, 20), (150, 20), (150, 150), (20, 150)])?;
        add_polygon(&mut algorithm, &[(100, 100), (230, 100), (230, 230), (100, 230)])?;
        build(&mut algorithm)?;
        let image = coverage(&algorithm)?;
        // overlap has winding number two and stays filled
        assert_eq!(image[7 + 7 * 16], 1);
        assert_eq!(image[2 + 2 * 16], 1);
        assert_eq!(image[12 + 12 * 16], 1);
        assert_eq!(image[12 + 2 * 16], 0);
        Ok(())
    }

    #[test]
    fn test_geometry_left_of_grid() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(4, 4), 4)?;
        add_polygon(&mut algorithm, &[(-100, 70), (100, 70), (100, 230), (-100, 230)])?;
        assert_eq!(algorithm.negative_half_plane_line_count(), 3);
        build(&mut algorithm)?;
        assert_eq!(algorithm.block_info(0, 2), BlockType::CompleteInside);
        assert_eq!(algorithm.block_info(2, 2), BlockType::CompleteOutside);
        let image = coverage(&algorithm)?;
        // pixel 5 (center at 88) is left of the right edge at x = 100
        assert_eq!(image[5 + 8 * 16], 1);
        assert_eq!(image[6 + 8 * 16], 0);
        assert_eq!(image[5 + 3 * 16], 0);
        Ok(())
    }

    #[test]
    fn test_geometry_outside_grid() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(4, 4), 12)?;
        // right of the grid
        add_polygon(&mut algorithm, &[(300, 70), (400, 70), (400, 230), (300, 230)])?;
        // below the X axis
        add_polygon(
            &mut algorithm,
            &[(10, -100), (100, -100), (100, -10), (10, -10)],
        )?;
        assert_eq!(algorithm.disregarded_line_count(), 8);
        assert!(algorithm.lines().is_empty());
        // left of the grid, kept in the margin with zero net winding
        add_polygon(&mut algorithm, &[(-100, 70), (-50, 70), (-50, 230), (-100, 230)])?;
        assert_eq!(algorithm.disregarded_line_count(), 8);
        assert_eq!(algorithm.lines().len(), 4);
        build(&mut algorithm)?;
        let blocks = classification(&algorithm);
        assert!(blocks.iter().all(|block| *block == BlockType::CompleteOutside));
        assert!(coverage(&algorithm)?.iter().all(|value| *value == 0));
        Ok(())
    }

    #[test]
    fn test_subpixel_coverage() -> Result<(), RasterizerError> {
        let params = GridParameters {
            subpixels_per_pixel_x: 4,
            subpixels_per_pixel_y: 2,
            ..grid(1, 1)
        };
        // 64 units per pixel in x, 32 in y, subpixel samples at 8, 24, 40, 56
        let mut algorithm = RasterizationAlgorithm::new(params, 4)?;
        add_polygon(&mut algorithm, &[(30, 0), (250, 0), (250, 110), (30, 110)])?;
        build(&mut algorithm)?;
        let mut buffer = vec![0; 16];
        algorithm.add_block_to_buffer(0, 0, &mut buffer)?;
        // first pixel column has two of four samples per row inside, pixel
        // rows are 32 units high so the bottom one (96..128) only has the
        // scan line at 104 inside
        #[rustfmt::skip]
        assert_eq!(buffer, vec![
            4, 8, 8, 8,
            4, 8, 8, 8,
            4, 8, 8, 8,
            2, 4, 4, 4,
        ]);
        Ok(())
    }

    #[test]
    fn test_long_diagonal_membership() -> Result<(), RasterizerError> {
        let mut algorithm = RasterizationAlgorithm::new(grid(4, 4), 1)?;
        algorithm.add_line(10, 250, 250, 10, 0)?;
        algorithm.build_blocks();
        // anti diagonal passes through the blocks on and next to the diagonal
        for block_x in 0..4u32 {
            let block_y = 3 - block_x;
            assert_eq!(algorithm.block_line_count(block_x, block_y), Some(1));
        }
        assert_eq!(algorithm.block_line_count(0, 0), Some(0));
        assert_eq!(algorithm.block_line_count(3, 3), Some(0));
        Ok(())
    }
}
