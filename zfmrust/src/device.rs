//! High-level device interface

use std::fmt;

use bytes::{Buf, Bytes};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use zfmrust_core::{
    CancelToken, CharBuffer, Command, Outcome, Packet, PacketHeader, PollOptions, PollOutcome,
    Presence, RawReply, Reassembler, Session, Transfer,
    constants::{NOTEPAD_PAGE_SIZE, NOTEPAD_PAGES, parameters},
    transfer,
};
use zfmrust_transport::Transport;
use zfmrust_types::{
    DeviceCapabilities, FingerImage, PackageSize, SearchMatch, SystemParameters, Template,
};

use crate::error::{Error, Result};

/// ZFM fingerprint module
///
/// One value per physical module. Every operation takes `&mut self`, so a
/// device has at most one exchange in flight; wrap it in
/// [`SharedDevice`](crate::SharedDevice) to share it between tasks.
///
/// Device status codes are returned as [`Outcome::Failure`], never as
/// errors. `Err` is reserved for framing, transport and protocol faults.
///
/// # Examples
///
/// ```no_run
/// use zfmrust::{Device, SerialTransport};
///
/// #[tokio::main]
/// async fn main() -> zfmrust::Result<()> {
///     let mut device = Device::new(SerialTransport::new("/dev/ttyUSB0", 57_600));
///
///     device.connect().await?;
///     println!("{}", device.summary().await?);
///
///     device.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Device<T> {
    transport: T,
    session: Session,
    name: Option<String>,
    capabilities: Option<DeviceCapabilities>,
    package_size: PackageSize,
    poll_options: PollOptions,
}

impl<T: Transport> Device<T> {
    /// Create a device on `transport`, using the factory address and password
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: Session::default(),
            name: None,
            capabilities: None,
            package_size: PackageSize::default(),
            poll_options: PollOptions::default(),
        }
    }

    /// Set module address (default: 0xFFFFFFFF)
    pub fn with_address(self, address: u32) -> Self {
        self.session.set_address(address);
        self
    }

    /// Set handshake password (default: 0)
    pub fn with_password(self, password: u32) -> Self {
        self.session.set_password(password);
        self
    }

    /// Set a display name (default: the port name)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set finger presence polling limits
    pub fn with_poll_options(mut self, options: PollOptions) -> Self {
        self.poll_options = options;
        self
    }

    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.transport.port_name())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn address(&self) -> u32 {
        self.session.address()
    }

    /// Hardware info read at connect time
    pub fn capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    /// Package size used for bulk transfers
    pub fn package_size(&self) -> PackageSize {
        self.package_size
    }

    pub fn poll_options(&self) -> PollOptions {
        self.poll_options
    }

    /// Check if connected and initialized
    pub fn is_connected(&self) -> bool {
        self.session.is_ready() && self.transport.is_open()
    }

    /// Open the transport and read the hardware info page
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The port cannot be opened
    /// - The module rejects the info page request
    /// - Fewer info page packets arrive than the module always sends
    pub async fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.transport.port_name());

        self.transport.open().await?;
        self.session.open()?;

        let capabilities = match self.read_info_page().await {
            Ok(capabilities) => capabilities,
            Err(e) => {
                warn!("Initialization failed: {}", e);
                self.session.close();
                if let Err(close_err) = self.transport.close().await {
                    warn!("Failed to close transport: {}", close_err);
                }
                return Err(e);
            }
        };

        self.package_size = capabilities.package_size();
        self.session.mark_ready()?;

        info!(
            "Connected to {} (library {}, {} packages)",
            capabilities.product_type,
            capabilities.library_size(),
            self.package_size
        );

        self.capabilities = Some(capabilities);
        Ok(())
    }

    /// Close the transport
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.session.is_open() {
            return Ok(());
        }

        info!("Disconnecting from {}...", self.transport.port_name());

        self.transport.close().await?;
        self.session.close();

        info!("Disconnected");
        Ok(())
    }

    /// Send one command and read its acknowledgment
    ///
    /// The reply carries the module's confirmation code unmodified. Bulk
    /// data that follows some commands is left on the link.
    pub async fn invoke(&mut self, command: &Command) -> Result<RawReply> {
        self.ensure_open()?;

        debug!(transfer = ?command.transfer(), "Invoking {}", command);

        let packet = self.session.command_packet(command);
        self.send_packet(&packet).await?;

        // The module may answer a successful SetAddr from its new address
        let alternate = match command {
            Command::SetAddress { address } => Some(*address),
            _ => None,
        };

        let reply = RawReply::from_packet(self.receive_packet(alternate).await?)?;
        reply.check_layout(command)?;

        debug!("{} -> {}", command, reply.status);

        Ok(reply)
    }

    /// Read the hardware info page
    pub async fn read_info_page(&mut self) -> Result<DeviceCapabilities> {
        let command = Command::ReadInfoPage;
        let reply = self.invoke(&command).await?;

        if !reply.status.is_ok() {
            return Err(Error::Rejected {
                command: command.name(),
                status: reply.status,
            });
        }

        let expected = command.transfer().packets(self.package_size.bytes());
        let mut pages = Vec::with_capacity(expected);
        while pages.len() < expected {
            match self.receive_packet(None).await {
                Ok(packet) if packet.is_data() => pages.push(packet.payload),
                Ok(packet) => {
                    return Err(zfmrust_core::Error::UnexpectedPacketType {
                        expected: "DATA or END_DATA",
                        actual: packet.packet_type,
                    }
                    .into());
                }
                Err(e) if e.is_timeout() => {
                    return Err(zfmrust_core::Error::MissingPackets {
                        expected,
                        received: pages.len(),
                    }
                    .into());
                }
                Err(e) => return Err(e),
            }
        }

        let capabilities = DeviceCapabilities::parse(&pages[0])?;
        debug!("Hardware info: {}", capabilities);

        Ok(capabilities)
    }

    /// Verify the session password
    pub async fn verify_password(&mut self) -> Result<Outcome<()>> {
        let password = self.session.password();
        self.execute(Command::VerifyPassword { password }, |_| Some(()))
            .await
    }

    /// Change the module password; later verifications use the new one
    pub async fn set_password(&mut self, password: u32) -> Result<Outcome<()>> {
        let outcome = self
            .execute(Command::SetPassword { password }, |_| Some(()))
            .await?;

        if outcome.is_success() {
            self.session.set_password(password);
        }

        Ok(outcome)
    }

    /// Change the module address; later commands are sent to the new one
    pub async fn set_address(&mut self, address: u32) -> Result<Outcome<u32>> {
        let outcome = self
            .execute(Command::SetAddress { address }, |_| Some(address))
            .await?;

        if outcome.is_success() {
            info!("Module address changed to 0x{:08X}", address);
            self.session.set_address(address);
        }

        Ok(outcome)
    }

    /// Write one system parameter
    pub async fn set_system_parameter(&mut self, parameter: u8, value: u8) -> Result<Outcome<()>> {
        let outcome = self
            .execute(Command::SetSystemParameter { parameter, value }, |_| Some(()))
            .await?;

        if outcome.is_success() && parameter == parameters::PACKAGE_SIZE {
            if let Some(size) = PackageSize::from_code(u16::from(value)) {
                debug!("Package size now {}", size);
                self.package_size = size;
            }
        }

        Ok(outcome)
    }

    /// Change the data package size used for bulk transfers
    pub async fn set_package_size(&mut self, size: PackageSize) -> Result<Outcome<()>> {
        self.set_system_parameter(parameters::PACKAGE_SIZE, size.code())
            .await
    }

    /// Change the matching security level (1 to 5)
    pub async fn set_security_level(&mut self, level: u8) -> Result<Outcome<()>> {
        if !(1..=5).contains(&level) {
            return Err(zfmrust_types::Error::Validation(format!(
                "security level must be 1 to 5, got {}",
                level
            ))
            .into());
        }

        self.set_system_parameter(parameters::SECURITY_LEVEL, level)
            .await
    }

    pub async fn read_system_parameters(&mut self) -> Result<Outcome<SystemParameters>> {
        let reply = self.invoke(&Command::ReadSystemParameters).await?;
        if !reply.status.is_ok() {
            return Ok(Outcome::Failure(reply.status));
        }

        Ok(Outcome::Success(SystemParameters::parse(&reply.payload)?))
    }

    /// Number of templates stored in the library
    pub async fn template_count(&mut self) -> Result<Outcome<u16>> {
        self.execute(Command::TemplateCount, |reply| reply.u16_at(0))
            .await
    }

    /// Capture a finger image into the image buffer
    pub async fn get_image(&mut self) -> Result<Outcome<()>> {
        self.execute(Command::GetImage, |_| Some(())).await
    }

    /// Upload the image buffer
    pub async fn upload_image(&mut self) -> Result<Outcome<FingerImage>> {
        match self.upload(Command::UploadImage).await? {
            Outcome::Success(data) => Ok(Outcome::Success(FingerImage::new(data)?)),
            Outcome::Failure(status) => Ok(Outcome::Failure(status)),
        }
    }

    /// Download an image into the image buffer
    pub async fn download_image(&mut self, image: &FingerImage) -> Result<Outcome<()>> {
        self.download(Command::DownloadImage, image.as_bytes().clone())
            .await
    }

    /// Generate a character file from the image buffer into `buffer`
    pub async fn image_to_char(&mut self, buffer: CharBuffer) -> Result<Outcome<()>> {
        self.execute(Command::ImageToChar { buffer }, |_| Some(()))
            .await
    }

    /// Merge both character buffers into a model
    pub async fn create_model(&mut self) -> Result<Outcome<()>> {
        self.execute(Command::CreateModel, |_| Some(())).await
    }

    /// Upload a character buffer
    pub async fn upload_char(&mut self, buffer: CharBuffer) -> Result<Outcome<Template>> {
        match self.upload(Command::UploadChar { buffer }).await? {
            Outcome::Success(data) => Ok(Outcome::Success(Template::new(data)?)),
            Outcome::Failure(status) => Ok(Outcome::Failure(status)),
        }
    }

    /// Download a template into a character buffer
    pub async fn download_char(
        &mut self,
        buffer: CharBuffer,
        template: &Template,
    ) -> Result<Outcome<()>> {
        self.download(Command::DownloadChar { buffer }, template.as_bytes().clone())
            .await
    }

    /// Store a character buffer in the library
    pub async fn store(&mut self, buffer: CharBuffer, page: u16) -> Result<Outcome<()>> {
        self.execute(Command::Store { buffer, page }, |_| Some(()))
            .await
    }

    /// Load a library template into a character buffer
    pub async fn load_char(&mut self, buffer: CharBuffer, page: u16) -> Result<Outcome<()>> {
        self.execute(Command::LoadChar { buffer, page }, |_| Some(()))
            .await
    }

    /// Delete `count` templates starting at `page`
    pub async fn delete_char(&mut self, page: u16, count: u16) -> Result<Outcome<()>> {
        self.execute(Command::DeleteChar { page, count }, |_| Some(()))
            .await
    }

    /// Delete every template in the library
    pub async fn empty_library(&mut self) -> Result<Outcome<()>> {
        warn!("Emptying finger library...");
        self.execute(Command::Empty, |_| Some(())).await
    }

    /// Compare both character buffers, returning the match score
    pub async fn match_buffers(&mut self) -> Result<Outcome<u16>> {
        self.execute(Command::Match, |reply| reply.u16_at(0)).await
    }

    /// Search the library for the contents of `buffer`
    pub async fn search(
        &mut self,
        buffer: CharBuffer,
        start_page: u16,
        page_count: u16,
    ) -> Result<Outcome<SearchMatch>> {
        let command = Command::Search {
            buffer,
            start_page,
            page_count,
        };
        self.execute(command, |reply| SearchMatch::parse(&reply.payload).ok())
            .await
    }

    /// High speed library search for the contents of `buffer`
    pub async fn high_speed_search(
        &mut self,
        buffer: CharBuffer,
        start_page: u16,
        page_count: u16,
    ) -> Result<Outcome<SearchMatch>> {
        let command = Command::HighSpeedSearch {
            buffer,
            start_page,
            page_count,
        };
        self.execute(command, |reply| SearchMatch::parse(&reply.payload).ok())
            .await
    }

    pub async fn random_code(&mut self) -> Result<Outcome<u32>> {
        self.execute(Command::GetRandomCode, |reply| reply.u32_at(0))
            .await
    }

    /// Write a 32-byte notepad page
    pub async fn write_notepad(
        &mut self,
        page: u8,
        data: [u8; NOTEPAD_PAGE_SIZE],
    ) -> Result<Outcome<()>> {
        check_notepad_page(page)?;
        self.execute(Command::WriteNotepad { page, data }, |_| Some(()))
            .await
    }

    /// Read a 32-byte notepad page
    pub async fn read_notepad(&mut self, page: u8) -> Result<Outcome<[u8; NOTEPAD_PAGE_SIZE]>> {
        check_notepad_page(page)?;
        self.execute(Command::ReadNotepad { page }, |reply| {
            <[u8; NOTEPAD_PAGE_SIZE]>::try_from(reply.payload.get(..NOTEPAD_PAGE_SIZE)?).ok()
        })
        .await
    }

    /// Capture once and report whether a finger is on the sensor
    ///
    /// Any rejected capture counts as "no finger".
    pub async fn finger_present(&mut self) -> Result<bool> {
        Ok(self.get_image().await?.is_success())
    }

    /// Repeat `GenImg` until the finger reaches `presence`, the limits in
    /// `options` run out, or `cancel` fires
    pub async fn poll_finger(
        &mut self,
        presence: Presence,
        options: &PollOptions,
        cancel: &CancelToken,
    ) -> Result<PollOutcome> {
        let deadline = Instant::now() + options.timeout;
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                debug!(?presence, attempts, "Presence poll cancelled");
                return Ok(PollOutcome::Cancelled { attempts });
            }

            let status = self.get_image().await?.status();
            attempts += 1;

            if presence.is_satisfied_by(status) {
                trace!(?presence, attempts, "Presence poll satisfied");
                return Ok(PollOutcome::Satisfied { attempts });
            }

            if options.attempts_exhausted(attempts) || Instant::now() >= deadline {
                debug!(?presence, attempts, "Presence poll timed out");
                return Ok(PollOutcome::TimedOut { attempts });
            }

            tokio::time::sleep(options.interval).await;
        }
    }

    /// Collect a printable summary, querying the current template count
    pub async fn summary(&mut self) -> Result<DeviceSummary> {
        let capabilities = self.capabilities.clone().ok_or(Error::NotConnected)?;
        let templates_used = self.template_count().await?.ok();

        Ok(DeviceSummary {
            name: self.name(),
            port: self.transport.port_name(),
            address: self.session.address(),
            package_size: self.package_size,
            templates_used,
            capabilities,
        })
    }

    // Helper methods

    fn ensure_open(&self) -> Result<()> {
        if !self.session.is_open() || !self.transport.is_open() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    /// Invoke `command` and decode its result fields on success
    async fn execute<U>(
        &mut self,
        command: Command,
        decode: impl FnOnce(&RawReply) -> Option<U>,
    ) -> Result<Outcome<U>> {
        let reply = self.invoke(&command).await?;

        if !reply.status.is_ok() {
            return Ok(Outcome::Failure(reply.status));
        }

        match decode(&reply) {
            Some(value) => Ok(Outcome::Success(value)),
            None => Err(zfmrust_core::Error::ReplyTooShort {
                command: command.name(),
                expected: command.reply_len(),
                actual: reply.payload.len(),
            }
            .into()),
        }
    }

    async fn upload(&mut self, command: Command) -> Result<Outcome<Bytes>> {
        let Transfer::Upload(kind) = command.transfer() else {
            return Err(not_a_transfer(&command, "upload"));
        };

        let reply = self.invoke(&command).await?;
        if !reply.status.is_ok() {
            return Ok(Outcome::Failure(reply.status));
        }

        let mut reassembler = Reassembler::new(kind.size(), self.package_size.bytes());
        debug!(
            "Receiving {} bytes in {} packets",
            kind.size(),
            reassembler.expected_packets()
        );

        while !reassembler.is_complete() {
            let packet = self.receive_packet(None).await?;
            reassembler.push(packet)?;
        }

        Ok(Outcome::Success(reassembler.finish()?))
    }

    async fn download(&mut self, command: Command, data: Bytes) -> Result<Outcome<()>> {
        let Transfer::Download(kind) = command.transfer() else {
            return Err(not_a_transfer(&command, "download"));
        };
        if data.len() != kind.size() {
            return Err(zfmrust_core::Error::TransferLength {
                expected: kind.size(),
                actual: data.len(),
            }
            .into());
        }

        let reply = self.invoke(&command).await?;
        if !reply.status.is_ok() {
            return Ok(Outcome::Failure(reply.status));
        }

        let packets = transfer::split(self.session.address(), &data, self.package_size.bytes());
        debug!("Sending {} bytes in {} packets", data.len(), packets.len());

        for packet in &packets {
            self.send_packet(packet).await?;
        }

        Ok(Outcome::Success(()))
    }

    async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        trace!("Sending: {:?}", packet);

        let data = packet.encode();
        self.transport.send(&data).await?;

        Ok(())
    }

    /// Read one frame: the fixed header first, then exactly the payload and
    /// checksum it announces
    async fn receive_packet(&mut self, alternate: Option<u32>) -> Result<Packet> {
        let head = self.transport.receive_exact(Packet::HEADER_SIZE).await?;
        let header = PacketHeader::parse(&head)?;

        let mut rest = self.transport.receive_exact(header.remaining_len()).await?;
        let payload = rest.split_to(header.payload_len()).freeze();
        let checksum = rest.get_u16();

        let packet = Packet::from_parts(header, payload, checksum)?;

        trace!("Received: {:?}", packet);

        self.session.check_origin(&packet, alternate)?;
        Ok(packet)
    }
}

fn not_a_transfer(command: &Command, direction: &str) -> Error {
    zfmrust_core::Error::InvalidSessionState(format!("{} does not {} a buffer", command, direction)).into()
}

fn check_notepad_page(page: u8) -> Result<()> {
    if page >= NOTEPAD_PAGES {
        return Err(zfmrust_types::Error::Validation(format!(
            "notepad page must be below {}, got {}",
            NOTEPAD_PAGES, page
        ))
        .into());
    }
    Ok(())
}

/// Printable description of a connected module
#[derive(Debug, Clone)]
pub struct DeviceSummary {
    pub name: String,
    pub port: String,
    pub address: u32,
    pub package_size: PackageSize,
    pub templates_used: Option<u16>,
    pub capabilities: DeviceCapabilities,
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let caps = &self.capabilities;

        writeln!(f, "Fingerprint reader {} on {}", self.name, self.port)?;
        writeln!(f, "Finger database: {}", caps.library_size())?;
        match self.templates_used {
            Some(used) => writeln!(f, "Database used: {}", used)?,
            None => writeln!(f, "Database used: unknown")?,
        }
        writeln!(f, "Security level: {}", caps.security_level())?;
        writeln!(f, "Address: 0x{:08X}", self.address)?;
        writeln!(f, "Package size: {}", self.package_size.bytes())?;
        writeln!(f, "Baud rate: {}", caps.baud_rate())?;
        writeln!(f, "Product type: {}", caps.product_type)?;
        writeln!(f, "Version: {}", caps.version)?;
        writeln!(f, "Manufacturer: {}", caps.manufacturer)?;
        write!(f, "Sensor: {}", caps.sensor)
    }
}
