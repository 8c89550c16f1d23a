//! Output device discovery
//!
//! Every host API cpal can open is searched, so on Linux both the JACK
//! server and the individual ALSA cards show up.

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, HostId};

use super::config::OutputTarget;
use super::error::{AudioError, AudioResult};

const OFFERED_RATES: [u32; 4] = [44100, 48000, 88200, 96000];

/// Short, user-facing host name (`Alsa` reads as `ALSA`)
fn host_name(id: HostId) -> String {
    let debug = format!("{:?}", id);
    match debug.as_str() {
        "Alsa" | "Asio" | "Jack" | "Wasapi" => debug.to_uppercase(),
        _ => debug,
    }
}

fn open_hosts() -> impl Iterator<Item = (String, Host)> {
    cpal::available_hosts().into_iter().filter_map(|id| match cpal::host_from_id(id) {
        Ok(host) => Some((host_name(id), host)),
        Err(e) => {
            log::debug!("Host {:?} unavailable: {}", id, e);
            None
        }
    })
}

#[derive(Debug, Clone)]
pub struct OutputDevice {
    pub target: OutputTarget,
    pub is_default: bool,
    /// Common rates the device supports, ascending
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl fmt::Display for OutputDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.target)?;
        if self.is_default {
            f.write_str(" (default)")?;
        }
        Ok(())
    }
}

fn describe(device: &Device, host: &str, default_name: Option<&str>) -> Option<OutputDevice> {
    let name = device.name().ok()?;
    let ranges: Vec<_> = device.supported_output_configs().ok()?.collect();
    let max_channels = ranges.iter().map(|r| r.channels()).max().unwrap_or(0);
    if max_channels == 0 {
        return None;
    }

    let sample_rates = OFFERED_RATES
        .into_iter()
        .filter(|rate| {
            ranges
                .iter()
                .any(|r| r.min_sample_rate().0 <= *rate && *rate <= r.max_sample_rate().0)
        })
        .collect();

    Some(OutputDevice {
        is_default: default_name == Some(name.as_str()),
        target: OutputTarget::named(name).on_host(host),
        sample_rates,
        max_channels,
    })
}

/// All output devices on all hosts; system defaults sort first
pub fn list_output_devices() -> AudioResult<Vec<OutputDevice>> {
    let mut found = Vec::new();

    for (label, host) in open_hosts() {
        let default_name = host.default_output_device().and_then(|d| d.name().ok());
        match host.output_devices() {
            Ok(devices) => found.extend(
                devices.filter_map(|d| describe(&d, &label, default_name.as_deref())),
            ),
            Err(e) => log::debug!("Cannot list {} devices: {}", label, e),
        }
    }

    if found.is_empty() {
        return Err(AudioError::NoDevices);
    }
    found.sort_by(|a, b| {
        (!a.is_default, &a.target.host, &a.target.name).cmp(&(!b.is_default, &b.target.host, &b.target.name))
    });
    log::info!("Found {} audio output devices", found.len());
    Ok(found)
}

/// Resolve a configured target, or the system default when there is none
pub fn open_output(target: Option<&OutputTarget>) -> AudioResult<Device> {
    let Some(target) = target else {
        return cpal::default_host()
            .default_output_device()
            .ok_or(AudioError::NoDefaultDevice);
    };

    let matches = |d: &Device| d.name().is_ok_and(|n| n == target.name);

    if let Some(wanted) = target.host.as_deref() {
        if let Some((_, host)) = open_hosts().find(|(label, _)| label == wanted) {
            return host
                .output_devices()?
                .find(matches)
                .ok_or_else(|| AudioError::DeviceNotFound(target.to_string()));
        }
        log::warn!("Host {} unavailable, searching all hosts for {}", wanted, target.name);
    }

    open_hosts()
        .filter_map(|(_, host)| host.output_devices().ok())
        .flatten()
        .find(matches)
        .ok_or_else(|| AudioError::DeviceNotFound(target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_names() {
        for id in cpal::available_hosts() {
            let name = host_name(id);
            assert!(!name.is_empty());
            if format!("{:?}", id) == "Alsa" {
                assert_eq!(name, "ALSA");
            }
        }
    }
}
