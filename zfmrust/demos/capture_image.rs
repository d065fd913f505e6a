//! Capture a finger image and save it as a bitmap
//!
//! Usage: `ZFM_PORT=/dev/ttyUSB0 cargo run --example capture_image -- finger.bmp`

use std::time::Duration;

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;
use zfmrust::{CancelToken, Device, Outcome, Presence, SerialTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("zfmrust=info".parse()?))
        .init();

    let port = std::env::var("ZFM_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "finger.bmp".to_string());

    let transport = SerialTransport::new(&port, 57_600).with_read_timeout(Duration::from_secs(2));
    let mut device = Device::new(transport);
    device.connect().await.context("connecting to module")?;

    println!("Place your finger on the sensor...");
    let options = device.poll_options();
    let poll = device
        .poll_finger(Presence::Placed, &options, &CancelToken::new())
        .await?;
    if !poll.is_satisfied() {
        bail!("no finger after {} attempts", poll.attempts());
    }

    let image = match device.upload_image().await? {
        Outcome::Success(image) => image,
        Outcome::Failure(status) => bail!("upload rejected: {}", status),
    };

    let path = image.write_bmp(&output)?;
    println!("Saved {}", path.display());

    device.disconnect().await?;

    Ok(())
}
