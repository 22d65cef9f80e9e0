use std::path::Path;

use chrono::Local;
use stitchcap::{BrowserKind, CaptureOptions, StitchBrowser, StitchEngine};

#[tokio::main]
async fn main() -> stitchcap::Result<()> {
    tracing_subscriber::fmt::init();

    // Browser selection comes from config.yml when present (driver.name,
    // driver.location), otherwise a default headless Chrome.
    let builder = StitchBrowser::builder().headless(true);
    let builder = if Path::new("config.yml").exists() {
        builder.config_file("config.yml")?
    } else {
        builder.browser(BrowserKind::Chrome)
    };
    let browser = builder.build().await?;

    let engine = StitchEngine::new(browser.wait_policy());
    let page = browser.new_page("https://www.python.org").await?;

    let full_name = format!("{}.png", Local::now().format("%Y-%m-%d%H-%M-%S"));
    let opts = CaptureOptions::new().image_name(full_name);
    let path = engine.capture(&page, &opts).await?;
    println!("Full-page screenshot saved to {}", path.display());

    let element_name = format!("{}_header.png", Local::now().format("%Y-%m-%d%H-%M-%S"));
    let captured = browser
        .capture_element("https://www.python.org/", "#touchnav-wrapper header", ".", &element_name)
        .await?;
    match captured {
        Some(path) => println!("Element screenshot saved to {}", path.display()),
        None => println!("No element screenshot produced"),
    }

    Ok(())
}
