//! Enrollment example
//!
//! Usage: `ZFM_PORT=/dev/ttyUSB0 cargo run --example enroll -- 5`

use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use zfmrust::{
    CancelToken, Device, EnrollEvent, EnrollState, EnrollStep, PollOptions, SerialTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("zfmrust=info".parse()?))
        .init();

    let port = std::env::var("ZFM_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let page: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "1".to_string())
        .parse()
        .context("page must be a number")?;

    let transport = SerialTransport::new(&port, 57_600).with_read_timeout(Duration::from_secs(2));
    let mut device = Device::new(transport)
        .with_poll_options(PollOptions::default().with_timeout(Duration::from_secs(15)));

    device.connect().await.context("connecting to module")?;
    println!("{}", device.summary().await?);

    let cancel = CancelToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let prompt = |event: &EnrollEvent| {
        if let EnrollEvent::StepStarted { state, step } = event {
            match (state, step) {
                (EnrollState::AwaitFinger1, EnrollStep::WaitForFinger) => {
                    println!("Place your finger on the sensor...")
                }
                (EnrollState::AwaitRemoval, EnrollStep::WaitForRemoval) => {
                    println!("Remove your finger...")
                }
                (EnrollState::AwaitFinger2, EnrollStep::WaitForFinger) => {
                    println!("Place the same finger again...")
                }
                _ => {}
            }
        }
    };

    match device.enroll(page, &cancel, &prompt).await? {
        EnrollState::Stored => println!("Finger stored at page {}", page),
        state => println!("Enrollment stopped: {}", state),
    }

    device.disconnect().await?;

    Ok(())
}
