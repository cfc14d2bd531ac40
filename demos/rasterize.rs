//! Very simple tool that rasterizes layer stored as JSON into a greyscale PNG image
#![deny(warnings)]
use layer_rasterizer::*;
use std::{
    env,
    fs::File,
    io::{BufWriter, Read},
};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

type Error = Box<dyn std::error::Error>;

#[derive(Debug)]
struct Args {
    input_file: String,
    output_file: String,
    width: u32,
    height: u32,
    dpi: Scalar,
    subsampling: u32,
    position: Point,
    anti_aliased: bool,
    outline: bool,
}

impl Args {
    fn parse() -> Result<Args, Error> {
        let mut result = Args {
            input_file: String::new(),
            output_file: String::new(),
            width: 512,
            height: 512,
            dpi: 254.0,
            subsampling: 1,
            position: Point::default(),
            anti_aliased: false,
            outline: false,
        };
        let mut positional = 0;
        let mut args = env::args();
        let cmd = args.next().unwrap_or_else(|| "rasterize".to_string());
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-h" => {
                    positional = 0;
                    break;
                }
                "-s" => {
                    let size = args.next().ok_or("-s requires argument")?;
                    let (width, height) = size.split_once('x').ok_or("-s expects <w>x<h>")?;
                    result.width = width.parse()?;
                    result.height = height.parse()?;
                }
                "-d" => {
                    result.dpi = args.next().ok_or("-d requires argument")?.parse()?;
                }
                "-p" => {
                    let position = args.next().ok_or("-p requires argument")?;
                    let (x, y) = position.split_once(',').ok_or("-p expects <x>,<y>")?;
                    result.position = Point::new(x.parse()?, y.parse()?);
                }
                "-n" => {
                    result.subsampling = args.next().ok_or("-n requires argument")?.parse()?;
                }
                "-a" => {
                    result.anti_aliased = true;
                }
                "-o" => {
                    result.outline = true;
                }
                _ => {
                    positional += 1;
                    match positional {
                        1 => result.input_file = arg,
                        2 => result.output_file = arg,
                        _ => return Err("unexpected positional argument".into()),
                    }
                }
            }
        }
        if positional < 2 {
            eprintln!("Very simple tool that rasterizes layer stored as JSON into a PNG image");
            eprintln!("\nUSAGE:");
            eprintln!(
                "    {} [-s <w>x<h>] [-d <dpi>] [-p <x>,<y>] [-n <subsampling>] [-a] [-o] <layer.json> <out.png>",
                cmd
            );
            eprintln!("\nARGS:");
            eprintln!("    -s <w>x<h>         size of the output image in pixels (default: 512x512)");
            eprintln!("    -d <dpi>           resolution of the output image (default: 254)");
            eprintln!("    -p <x>,<y>         position of the image in millimeters");
            eprintln!("    -n <subsampling>   subpixels per pixel along each axis (default: 1)");
            eprintln!("    -a                 anti-aliased output");
            eprintln!("    -o                 draw outlines instead of filling");
            eprintln!("    <layer.json>       file containing layer ('-' means stdin)");
            eprintln!("    <out.png>          image rendered in the PNG format ('-' means stdout)");
            std::process::exit(1);
        }
        Ok(result)
    }
}

/// Load layer from the file
fn layer_load(path: &str) -> Result<LayerDataObject, Error> {
    let mut contents = String::new();
    if path != "-" {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    } else {
        std::io::stdin().read_to_string(&mut contents)?;
    }
    Ok(tracing::debug_span!("[parse]").in_scope(|| serde_json::from_str(&contents))?)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    let layer = layer_load(&args.input_file)?;
    tracing::debug!("[layer:entity_count] {}", layer.entity_count());

    let mut image = ImageObject::new(args.width, args.height, args.dpi, args.dpi)?;
    image.set_position(args.position.x(), args.position.y());
    if args.outline {
        tracing::debug_span!("[outline]").in_scope(|| image.draw_layer_object(&layer, 255));
    } else {
        image.init_rasterization_algorithms(
            DEFAULT_UNITS_PER_SUBPIXEL,
            DEFAULT_PIXELS_PER_BLOCK,
            args.subsampling,
            args.subsampling,
        )?;
        image.add_rasterization_layer(&layer)?;
        tracing::debug_span!("[rasterize]")
            .in_scope(|| image.calculate_rasterization_image(args.anti_aliased))?;
    }

    let save = tracing::debug_span!("[save]");
    let _guard = save.enter();
    if args.output_file != "-" {
        image.write_png(BufWriter::new(File::create(args.output_file)?))?;
    } else {
        image.write_png(BufWriter::new(std::io::stdout().lock()))?;
    }

    Ok(())
}
