use stitchcap::{BrowserKind, StitchBrowser};

#[tokio::main]
async fn main() -> stitchcap::Result<()> {
    let browser = StitchBrowser::builder()
        .browser(BrowserKind::Chrome)
        .headless(true)
        .build()
        .await?;
    let page = browser.new_page("https://example.com").await?;

    println!("Title: {}", page.title().await?);

    page.screenshot_to_file("screenshot.png").await?;
    println!("Screenshot saved to screenshot.png");

    browser.close().await?;
    Ok(())
}
