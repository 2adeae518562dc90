//! screenshoter-cli: Command-line tool for image pipeline and stitching debugging
//!
//! Runs the image operations, marker detection and the stitcher against files
//! or the built-in mock driver, without a browser session.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use screenshoter_core::capture::matching::{Pattern, device_id, find_device_offset, find_pattern};
use screenshoter_core::capture::{
    ContextTree, MockDriver, ScreenshotTarget, session_from_mock, take_screenshot,
};
use screenshoter_core::imaging::Image;
use screenshoter_core::model::{
    DriverInfo, ElementId, Orientation, Region, ScreenshotSettings, ScrollingMode, Size,
};
use screenshoter_core::util::detect::{parse_capabilities, parse_user_agent};

#[derive(Parser)]
#[command(name = "screenshoter-cli")]
#[command(about = "CLI tool for image pipeline, marker detection and stitching debugging")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crop an image to a rectangle
    Crop {
        /// Input PNG or JPEG file
        input: PathBuf,
        /// Output PNG file
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value_t = 0)]
        x: i32,
        #[arg(long, default_value_t = 0)]
        y: i32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Scale an image by a ratio
    Scale {
        /// Input PNG or JPEG file
        input: PathBuf,
        /// Output PNG file
        #[arg(short, long)]
        out: PathBuf,
        /// Scale ratio (0.5 halves both dimensions)
        #[arg(long)]
        ratio: f64,
    },
    /// Rotate an image by a multiple of 90 degrees
    Rotate {
        /// Input PNG or JPEG file
        input: PathBuf,
        /// Output PNG file
        #[arg(short, long)]
        out: PathBuf,
        /// Clockwise rotation in degrees, negative values rotate counterclockwise
        #[arg(long, allow_hyphen_values = true)]
        degrees: i32,
    },
    /// Locate the page marker in a raw screenshot
    FindPattern {
        /// Screenshot file
        input: PathBuf,
        /// Device pixel ratio the screenshot was taken at
        #[arg(long, default_value_t = 1.0)]
        pixel_ratio: f64,
        /// Use the device table entry instead of the pixel ratio
        #[arg(long)]
        device: Option<String>,
        /// Orientation for the device table lookup (portrait, landscape)
        #[arg(long, default_value = "portrait")]
        orientation: String,
    },
    /// Place a capture into a device bezel
    Frame {
        /// Content image
        content: PathBuf,
        /// Bezel image; also used for the lower edge
        #[arg(long)]
        bezel: PathBuf,
        /// Output PNG file
        #[arg(short, long)]
        out: PathBuf,
        /// Hole in the bezel as x,y,width,height
        #[arg(long, value_delimiter = ',', num_args = 4)]
        hole: Vec<i64>,
    },
    /// Stitch the synthetic page of the mock driver
    Demo {
        /// Output PNG file
        #[arg(short, long)]
        out: PathBuf,
        /// Viewport width in CSS pixels
        #[arg(long, default_value_t = 800)]
        width: u32,
        /// Viewport height in CSS pixels
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// Page height in CSS pixels
        #[arg(long, default_value_t = 5000)]
        content_height: u32,
        /// Device pixel ratio of the simulated screen
        #[arg(long, default_value_t = 1.0)]
        pixel_ratio: f64,
        /// Status bar height in CSS pixels; enables mobile marker detection
        #[arg(long, default_value_t = 0)]
        status_bar: u32,
        /// Rows skipped under sticky headers
        #[arg(long, default_value_t = 0)]
        overlap: u32,
        /// Scroll with CSS translate instead of native scrolling
        #[arg(long)]
        css: bool,
    },
    /// Print the session facts derived from capabilities or a user agent
    Detect {
        /// User agent string
        #[arg(long)]
        user_agent: Option<String>,
        /// JSON file with driver capabilities
        #[arg(long)]
        capabilities: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("screenshoter_cli=info".parse()?)
                .add_directive("screenshoter_core=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crop {
            input,
            out,
            x,
            y,
            width,
            height,
        } => {
            let mut image = open(&input)?;
            image.crop(Region::new(x, y, width, height))?;
            save(&image, &out)?;
        }
        Commands::Scale { input, out, ratio } => {
            let mut image = open(&input)?;
            image.scale(ratio)?;
            save(&image, &out)?;
        }
        Commands::Rotate {
            input,
            out,
            degrees,
        } => {
            let mut image = open(&input)?;
            image.rotate(degrees)?;
            save(&image, &out)?;
        }
        Commands::FindPattern {
            input,
            pixel_ratio,
            device,
            orientation,
        } => {
            find_marker(input, pixel_ratio, device, orientation)?;
        }
        Commands::Frame {
            content,
            bezel,
            out,
            hole,
        } => {
            frame(content, bezel, out, hole)?;
        }
        Commands::Demo {
            out,
            width,
            height,
            content_height,
            pixel_ratio,
            status_bar,
            overlap,
            css,
        } => {
            demo(out, Size::new(width, height), content_height, pixel_ratio, status_bar, overlap, css)
                .await?;
        }
        Commands::Detect {
            user_agent,
            capabilities,
        } => {
            detect(user_agent, capabilities)?;
        }
    }

    Ok(())
}

fn open(path: &Path) -> Result<Image> {
    let image = Image::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!("Loaded {} ({})", path.display(), image.size());
    Ok(image)
}

fn save(image: &Image, out: &Path) -> Result<()> {
    println!("Encoding {} image...", image.size());
    let data = image.to_png()?;
    fs::write(out, data)?;
    println!("✓ Image saved to {}", out.display());
    Ok(())
}

fn find_marker(
    input: PathBuf,
    pixel_ratio: f64,
    device: Option<String>,
    orientation_str: String,
) -> Result<()> {
    let pixels = open(&input)?.to_object()?;

    let found = match device {
        Some(name) => {
            let orientation = match orientation_str.to_lowercase().as_str() {
                "portrait" => Orientation::Portrait,
                "landscape" => Orientation::Landscape,
                _ => anyhow::bail!(
                    "Invalid orientation '{}'. Must be portrait or landscape",
                    orientation_str
                ),
            };
            let id = device_id(&name, orientation);
            println!("Using device table entry {}", id);
            find_device_offset(&pixels, &id)
        }
        None => {
            if !(pixel_ratio.is_finite() && pixel_ratio > 0.0) {
                anyhow::bail!("Pixel ratio must be a positive number");
            }
            find_pattern(&pixels, &Pattern::page_marker(pixel_ratio))
        }
    };

    match found {
        Some(offset) => println!("✓ Marker found, viewport starts at {}", offset),
        None => println!("✗ Marker not found"),
    }
    Ok(())
}

fn frame(content: PathBuf, bezel: PathBuf, out: PathBuf, hole: Vec<i64>) -> Result<()> {
    let [x, y, width, height] = hole[..] else {
        anyhow::bail!("Hole must be given as x,y,width,height");
    };
    if width < 0 || height < 0 {
        anyhow::bail!("Hole width and height must not be negative");
    }
    let hole = Region::new(
        i32::try_from(x)?,
        i32::try_from(y)?,
        u32::try_from(width)?,
        u32::try_from(height)?,
    );

    let content = open(&content)?;
    let bezel = open(&bezel)?;
    let framed = content.frame(&bezel, &bezel, hole)?;
    save(&framed, &out)
}

async fn demo(
    out: PathBuf,
    viewport: Size,
    content_height: u32,
    pixel_ratio: f64,
    status_bar: u32,
    overlap: u32,
    css: bool,
) -> Result<()> {
    if !(pixel_ratio.is_finite() && pixel_ratio > 0.0) {
        anyhow::bail!("Pixel ratio must be a positive number");
    }

    let info = DriverInfo {
        is_mobile: status_bar > 0,
        pixel_ratio,
        ..DriverInfo::default()
    };
    let driver = Arc::new(
        MockDriver::new(viewport, Size::new(viewport.width, content_height))
            .with_status_bar(status_bar)
            .with_info(info),
    );
    let session = session_from_mock(driver.clone());
    tracing::info!("Demo session: {:?}", session);
    let tree = ContextTree::new(Some(ElementId::new("html")));

    let settings = ScreenshotSettings::builder()
        .fully(true)
        .wait_ms(0)
        .overlap(overlap)
        .scrolling_mode(if css { ScrollingMode::Css } else { ScrollingMode::Scroll })
        .build();

    println!("Stitching {}x{} page through a {} viewport...", viewport.width, content_height, viewport);
    let shot = take_screenshot(&session, &tree, &ScreenshotTarget::context(tree.main()), &settings).await?;
    println!(
        "Stitched region {} from {} captures",
        shot.region,
        driver.screenshot_count()
    );
    save(&shot.image, &out)
}

fn detect(user_agent: Option<String>, capabilities: Option<PathBuf>) -> Result<()> {
    if user_agent.is_none() && capabilities.is_none() {
        anyhow::bail!("At least one of --user-agent or --capabilities must be specified");
    }

    if let Some(ua) = &user_agent {
        let parsed = parse_user_agent(ua);
        println!("User agent:");
        println!("  Platform: {} {}", parsed.platform_name, parsed.platform_version.as_deref().unwrap_or(""));
        println!("  Browser: {} {}", parsed.browser_name, parsed.browser_version.as_deref().unwrap_or(""));
        println!();
    }

    let mut info = match capabilities {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)?;
            parse_capabilities(&value)
        }
        None => DriverInfo::default(),
    };
    if let Some(ua) = &user_agent {
        info = info.with_user_agent(ua);
    }

    println!("Session facts:");
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
