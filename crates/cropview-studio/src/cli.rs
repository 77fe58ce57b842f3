use std::path::PathBuf;

use clap::Parser;

/// Crops an image through the GPU crop view and writes the result as PNG.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Image to load (PNG, JPEG, BMP, GIF, TIFF, WebP)
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Where to write the captured frame
    #[arg(short = 'o', long = "output", value_name = "PNG", default_value = "crop.png")]
    pub output: PathBuf,

    /// Output surface size
    #[arg(long = "view", value_names = ["WIDTH", "HEIGHT"], num_args = 2, default_values_t = vec![512, 512])]
    pub view: Vec<u32>,

    /// Zoom factor relative to the cover-fit view (> 1 zooms in)
    #[arg(short = 's', long = "scale", value_name = "FACTOR")]
    pub scale: Option<f32>,

    /// Pan by a pixel delta on the output surface
    #[arg(long = "pan", value_names = ["DX", "DY"], num_args = 2, allow_negative_numbers = true)]
    pub pan: Option<Vec<f32>>,

    /// Quarter turns; negative values turn counter-clockwise
    #[arg(short = 'r', long = "rotate", value_name = "STEPS", allow_negative_numbers = true, default_value_t = 0)]
    pub rotate_steps: i32,

    /// Fine rotation angle in degrees
    #[arg(short = 'a', long = "angle", value_name = "DEGREES", allow_negative_numbers = true)]
    pub angle: Option<f32>,

    /// Insets of the crop circle from the output edges
    #[arg(long = "insets", value_names = ["LEFT", "TOP", "RIGHT", "BOTTOM"], num_args = 4)]
    pub insets: Option<Vec<f32>>,

    /// Render at this size for the capture only
    #[arg(long = "capture-size", value_names = ["WIDTH", "HEIGHT"], num_args = 2, conflicts_with = "square")]
    pub capture_size: Option<Vec<u32>>,

    /// Capture only the square between the left/right insets, starting TOP pixels down
    #[arg(long = "square", value_names = ["LEFT", "TOP"], num_args = 2)]
    pub square: Option<Vec<u32>>,

    /// Background color as 0xRRGGBB
    #[arg(long = "background", value_name = "HEX", value_parser = parse_hex_rgb)]
    pub background: Option<[f32; 3]>,

    /// Seconds to wait for the render thread
    #[arg(long = "timeout", value_name = "SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Increase logging verbosity (-v: debug, -vv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

fn parse_hex_rgb(s: &str) -> Result<[f32; 3], String> {
    let digits = s.trim_start_matches("0x").trim_start_matches('#');
    let value = u32::from_str_radix(digits, 16).map_err(|e| format!("invalid color {s:?}: {e}"))?;
    if digits.len() != 6 {
        return Err(format!("expected six hex digits, got {s:?}"));
    }
    let channel = |shift: u32| ((value >> shift) & 0xff) as f32 / 255.0;
    Ok([channel(16), channel(8), channel(0)])
}
