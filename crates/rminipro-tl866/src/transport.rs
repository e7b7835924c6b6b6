//! Bulk transport abstraction for TL866 communication
//!
//! The protocol layer only needs to push a frame out and pull a frame in.
//! Transfer counts are reported back unchanged so the session can reject
//! short transfers; this layer never retries.

use crate::error::Result;

/// Raw bulk channel to the programmer
pub trait Transport {
    /// Send `data`, returning the number of bytes the device accepted
    fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Receive into `buf`, returning the number of bytes the device sent
    ///
    /// The count may differ from `buf.len()`; bytes beyond `buf` are dropped.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;
}

pub mod usb {
    //! nusb-backed transport

    use std::time::Duration;

    use nusb::transfer::{Buffer, Bulk, In, Out};
    use nusb::{Endpoint, MaybeFuture};

    use super::Transport;
    use crate::error::{Result, Tl866Error};
    use crate::protocol::{BULK_IN_EP, BULK_OUT_EP, TL866_USB_PRODUCT, TL866_USB_VENDOR};

    /// Default per-transfer timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Options for opening a programmer
    #[derive(Debug, Clone)]
    pub struct UsbConfig {
        /// Device index (when multiple programmers are connected)
        pub index: usize,
        /// Timeout applied to every bulk transfer
        pub timeout: Duration,
    }

    impl Default for UsbConfig {
        fn default() -> Self {
            Self {
                index: 0,
                timeout: DEFAULT_TIMEOUT,
            }
        }
    }

    /// Parse options from key=value pairs
    pub fn parse_options(options: &[(&str, &str)]) -> Result<UsbConfig> {
        let mut config = UsbConfig::default();

        for (key, value) in options {
            match *key {
                "index" | "device" => {
                    config.index = value.parse().map_err(|_| {
                        Tl866Error::InvalidParameter(format!("index: {}", value))
                    })?;
                }
                "timeout" => {
                    let ms: u64 = value.parse().map_err(|_| {
                        Tl866Error::InvalidParameter(format!("timeout: {}", value))
                    })?;
                    if ms == 0 {
                        return Err(Tl866Error::InvalidParameter(
                            "timeout must be non-zero".to_string(),
                        ));
                    }
                    config.timeout = Duration::from_millis(ms);
                }
                _ => {
                    return Err(Tl866Error::InvalidParameter(format!(
                        "unknown option: {}",
                        key
                    )));
                }
            }
        }

        Ok(config)
    }

    /// Information about a connected programmer
    #[derive(Debug, Clone)]
    pub struct UsbDeviceInfo {
        /// USB bus number
        pub bus: u8,
        /// USB device address
        pub address: u8,
    }

    impl std::fmt::Display for UsbDeviceInfo {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TL866 at bus {} address {}", self.bus, self.address)
        }
    }

    /// List all connected programmers
    pub fn list_devices() -> Result<Vec<UsbDeviceInfo>> {
        let devices = nusb::list_devices()
            .wait()?
            .filter(|d| d.vendor_id() == TL866_USB_VENDOR && d.product_id() == TL866_USB_PRODUCT)
            .map(|d| UsbDeviceInfo {
                bus: d.busnum(),
                address: d.device_address(),
            })
            .collect();

        Ok(devices)
    }

    /// Bulk endpoints of an opened programmer
    pub struct UsbTransport {
        out_ep: Endpoint<Bulk, Out>,
        in_ep: Endpoint<Bulk, In>,
        timeout: Duration,
    }

    impl UsbTransport {
        /// Open a programmer with the specified configuration
        pub fn open_with_config(config: &UsbConfig) -> Result<Self> {
            let devices: Vec<_> = nusb::list_devices()
                .wait()
                .map_err(|e| Tl866Error::OpenFailed(e.to_string()))?
                .filter(|d| {
                    d.vendor_id() == TL866_USB_VENDOR && d.product_id() == TL866_USB_PRODUCT
                })
                .collect();

            let device_info = devices
                .get(config.index)
                .ok_or(Tl866Error::DeviceNotFound)?;

            log::info!(
                "Opening TL866 at bus {} address {}",
                device_info.busnum(),
                device_info.device_address()
            );

            let device = device_info
                .open()
                .wait()
                .map_err(|e| Tl866Error::OpenFailed(e.to_string()))?;

            let interface = device
                .claim_interface(0)
                .wait()
                .map_err(|e| Tl866Error::ClaimFailed(e.to_string()))?;

            let out_ep = interface
                .endpoint::<Bulk, Out>(BULK_OUT_EP)
                .map_err(|e| Tl866Error::ClaimFailed(e.to_string()))?;
            let in_ep = interface
                .endpoint::<Bulk, In>(BULK_IN_EP)
                .map_err(|e| Tl866Error::ClaimFailed(e.to_string()))?;

            Ok(Self {
                out_ep,
                in_ep,
                timeout: config.timeout,
            })
        }
    }

    impl Transport for UsbTransport {
        fn send(&mut self, data: &[u8]) -> Result<usize> {
            let mut buf = Buffer::new(data.len());
            buf.extend_from_slice(data);

            let completion = self.out_ep.transfer_blocking(buf, self.timeout);
            completion
                .status
                .map_err(|e| Tl866Error::TransferFailed(e.to_string()))?;

            log::trace!("USB write {} bytes", completion.actual_len);
            Ok(completion.actual_len)
        }

        fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
            let max_packet_size = self.in_ep.max_packet_size();
            let request_len = buf.len().div_ceil(max_packet_size) * max_packet_size;
            let mut in_buf = Buffer::new(request_len);
            in_buf.set_requested_len(request_len);

            let completion = self.in_ep.transfer_blocking(in_buf, self.timeout);
            let data = completion
                .into_result()
                .map_err(|e| Tl866Error::TransferFailed(e.to_string()))?;

            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);

            log::trace!("USB read {} bytes", data.len());
            Ok(data.len())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_parse_options() {
            let config = parse_options(&[]).unwrap();
            assert_eq!(config.index, 0);
            assert_eq!(config.timeout, DEFAULT_TIMEOUT);

            let config = parse_options(&[("index", "2"), ("timeout", "250")]).unwrap();
            assert_eq!(config.index, 2);
            assert_eq!(config.timeout, Duration::from_millis(250));

            assert_eq!(parse_options(&[("device", "1")]).unwrap().index, 1);
        }

        #[test]
        fn test_parse_options_rejects() {
            for options in [
                &[("timeout", "0")][..],
                &[("timeout", "soon")][..],
                &[("index", "-1")][..],
                &[("speed", "fast")][..],
            ] {
                assert!(matches!(
                    parse_options(options),
                    Err(Tl866Error::InvalidParameter(_))
                ));
            }
        }
    }
}
