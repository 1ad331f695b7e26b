//! Signal catalog - the static, ordered registry of addressable signals.
//!
//! # Ordering
//!
//! Two address spaces are merged into one flat list:
//!
//! ```text
//! [ service 0x01 PIDs in declared order ][ service 0x22 DIDs in declared order ]
//!   index 0 ..                             .. len - 1
//! ```
//!
//! The index is what Configure-mode cursor navigation walks, so the order is
//! part of the contract and never changes after construction.
//!
//! # Decoding
//!
//! Each entry carries a [`Decoder`] variant rather than a callable. Decoding
//! returns `Result`; turning a failure into display text is the correlator's job.

use std::collections::HashMap;

use diagscope_common::{hex_bytes, DEFAULT_NODE, DIRECTION_BIT, SERVICE_CURRENT_DATA, SERVICE_READ_BY_ID};
use log::warn;

use crate::domain::{DecodeError, SignalKey};

// =============================================================================
// DECODERS
// =============================================================================

/// Byte-to-text conversion selected per catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// `A` kPa
    Pressure,
    /// `(A*256 + B) / 4` rpm
    Rpm,
    /// `A` km/h
    Speed,
    /// `A * 100 / 255` %
    Percent,
    /// `A - 40` °C
    Temperature,
    /// `A / 10` V
    Voltage,
    /// `A != 0`
    YesNo,
    /// Raw bytes as hex
    Hex,
}

impl Decoder {
    /// Bytes this decoder needs at minimum
    #[must_use]
    pub fn min_len(self) -> usize {
        match self {
            Decoder::Rpm => 2,
            Decoder::Hex => 0,
            _ => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Decoder::Pressure => "Pressure",
            Decoder::Rpm => "RPM",
            Decoder::Speed => "Speed",
            Decoder::Percent => "Percent",
            Decoder::Temperature => "Temperature",
            Decoder::Voltage => "Voltage",
            Decoder::YesNo => "Boolean",
            Decoder::Hex => "Hex",
        }
    }

    /// Convert a value payload to display text
    ///
    /// # Errors
    /// Returns [`DecodeError::ShortPayload`] when `data` is shorter than [`Decoder::min_len`]
    pub fn decode(self, data: &[u8]) -> Result<String, DecodeError> {
        if data.len() < self.min_len() {
            return Err(DecodeError::ShortPayload {
                decoder: self.name(),
                need: self.min_len(),
                got: data.len(),
            });
        }

        let text = match self {
            Decoder::Pressure => format!("{} kPa", data[0]),
            Decoder::Rpm => {
                let raw = u16::from_be_bytes([data[0], data[1]]);
                format!("{:.0} rpm", f64::from(raw) / 4.0)
            }
            Decoder::Speed => format!("{} km/h", data[0]),
            Decoder::Percent => format!("{:.1} %", f64::from(data[0]) * 100.0 / 255.0),
            Decoder::Temperature => format!("{} °C", i16::from(data[0]) - 40),
            Decoder::Voltage => format!("{:.1} V", f64::from(data[0]) / 10.0),
            Decoder::YesNo => String::from(if data[0] == 0 { "No" } else { "Yes" }),
            Decoder::Hex => hex_bytes(data),
        };
        Ok(text)
    }
}

// =============================================================================
// CATALOG DATA
// =============================================================================

type Declaration = (u32, &'static str, &'static str, Decoder);

/// Service 0x01 parameter ids
const PID_TABLE: &[Declaration] = &[
    (0x04, "Calculated Engine Load", "Engine load as a percentage", Decoder::Percent),
    (0x05, "ECT", "Engine coolant temperature", Decoder::Temperature),
    (0x06, "STFT B1", "Bank 1 short-term fuel trim", Decoder::Percent),
    (0x07, "LTFT B1", "Bank 1 long-term fuel trim", Decoder::Percent),
    (0x08, "STFT B2", "Bank 2 short-term fuel trim", Decoder::Percent),
    (0x09, "LTFT B2", "Bank 2 long-term fuel trim", Decoder::Percent),
    (0x0A, "FP", "Fuel rail pressure", Decoder::Pressure),
    (0x0B, "MAP", "Intake manifold pressure in kPa", Decoder::Pressure),
    (0x0C, "RPM", "Engine speed in revolutions per minute", Decoder::Rpm),
    (0x0D, "VSS", "Vehicle speed in km/h", Decoder::Speed),
    (0x0E, "Timing Advance", "Ignition timing advance before TDC", Decoder::Hex),
    (0x0F, "Intake Air Temperature", "Temperature of air entering engine", Decoder::Temperature),
    (0x10, "MAF", "Mass air flow rate into engine", Decoder::Hex),
    (0x11, "TPS", "Throttle position sensor", Decoder::Percent),
    (0x46, "AAT", "Outside air temperature", Decoder::Temperature),
    (0x1F, "Run Time Since Engine Start", "Elapsed time since engine started", Decoder::Hex),
    (0x21, "Distance with MIL On", "Distance traveled with MIL on", Decoder::Hex),
    (0x2F, "Fuel Level Input", "Fuel level as a percentage", Decoder::Percent),
    (0x33, "Barometric Pressure", "Ambient barometric pressure", Decoder::Pressure),
    (0x46, "Ambient Air Temperature", "Outside air temperature", Decoder::Temperature),
    (0x5C, "Engine Oil Temperature", "Temperature of engine oil", Decoder::Temperature),
    (0x5E, "Engine Fuel Rate", "Fuel consumption rate", Decoder::Hex),
];

/// Service 0x22 data identifiers
const DID_TABLE: &[Declaration] = &[
    (0x1000, "ECU Identification", "ECU hardware and software identifiers", Decoder::Hex),
    (0x1001, "VIN", "Vehicle Identification Number", Decoder::Hex),
    (0x1003, "Calibration ID", "Software calibration identifier", Decoder::Hex),
    (0x1005, "ECU Serial Number", "Unique ECU serial number", Decoder::Hex),
    (0x1010, "ECU Software Version", "Software version of ECU", Decoder::Hex),
    (0x1100, "Engine Speed", "Current engine speed (RPM)", Decoder::Rpm),
    (0x1101, "Vehicle Speed", "Vehicle speed in km/h", Decoder::Speed),
    (0x1102, "Throttle Position", "Throttle angle position", Decoder::Percent),
    (0x1103, "Intake Manifold Pressure", "Intake manifold pressure", Decoder::Pressure),
    (0x1104, "Engine Load", "Engine load as a percentage", Decoder::Percent),
    (0x1105, "Mass Air Flow", "Mass air flow rate", Decoder::Hex),
    (0x1106, "Intake Air Temperature", "Temperature of intake air", Decoder::Temperature),
    (0x1107, "Coolant Temperature", "Engine coolant temperature", Decoder::Temperature),
    (0x1108, "Barometric Pressure", "Atmospheric pressure", Decoder::Pressure),
    (0x1110, "Fuel Rail Pressure", "Fuel rail pressure", Decoder::Pressure),
    (0x1111, "Fuel Pump Command", "Fuel pump control signal", Decoder::Percent),
    (0x1112, "Oil Pressure", "Measured engine oil pressure", Decoder::Pressure),
    (0x1113, "Oil Temperature", "Measured oil temperature", Decoder::Temperature),
    (0x1900, "AFM Active Cylinders Mask", "Active cylinder bitmask", Decoder::Hex),
    (0x1901, "AFM Mode Active", "Indicates if AFM is currently active", Decoder::YesNo),
    (0x1902, "AFM Commanded State", "AFM commanded on/off state", Decoder::YesNo),
    (0x1903, "AFM Transition Counter", "Counts AFM on/off transitions", Decoder::Hex),
    (0x1904, "AFM Desired Cylinder Torque", "Desired torque in AFM mode", Decoder::Hex),
    (0x1905, "AFM Actual Cylinder Torque", "Measured torque in AFM mode", Decoder::Hex),
    (0x1906, "AFM Intake Manifold Pressure", "MAP during AFM mode", Decoder::Pressure),
    (0x1907, "AFM Estimated Fuel Savings", "Estimated fuel saved by AFM", Decoder::Percent),
    (0x1910, "AFM Fault Status", "Current AFM fault state", Decoder::Hex),
    (0x1911, "AFM Enable Criteria Satisfied", "If AFM enable conditions are met", Decoder::YesNo),
    (0x1912, "AFM Disable Reason", "Reason AFM disabled", Decoder::Hex),
    (0x2000, "Gear Position", "Transmission gear selection", Decoder::Hex),
    (0x2001, "Trans Oil Temp", "Transmission oil temperature", Decoder::Temperature),
    (0x2002, "Clutch Command", "Torque converter clutch command", Decoder::Hex),
    (0x2003, "VSS", "Vehicle speed sensor reading", Decoder::Speed),
    (0x2010, "Brake Pedal Pos", "Brake pedal position sensor", Decoder::Percent),
    (0x2011, "Accel Pedal Pos", "Accelerator pedal position sensor", Decoder::Percent),
    (0x2020, "Steering Angle", "Current steering wheel angle", Decoder::Hex),
    (0x2021, "Yaw Rate", "Vehicle yaw rate", Decoder::Hex),
    (0x3000, "Ambient Temp", "Outside air temperature", Decoder::Temperature),
    (0x3001, "Battery Voltage", "System voltage", Decoder::Voltage),
    (0x3002, "Alternator Load", "Alternator output load", Decoder::Percent),
    (0x3003, "Odometer", "Total vehicle distance traveled", Decoder::Hex),
    (0x3004, "Ignition Status", "Ignition key/run state", Decoder::Hex),
    (0xF40C, "GM Engine Load (Alt)", "Alternate engine load calculation", Decoder::Percent),
    (0xF41F, "GM AFM Active", "Active Fuel Management engaged", Decoder::YesNo),
];

/// Diagnostic node names, keyed by request address
const NODE_NAMES: &[(u16, &str)] = &[
    (0x7E0, "ECM"),
    (0x7E1, "TCM"),
    (0x7E2, "ABS"),
    (0x7E3, "SRS"),
    (0x7E4, "BCM"),
    (0x7E5, "IPC"),
    (0x7E6, "HVAC"),
    (0x7E7, "Gateway"),
    (0x771, "ABS (alt)"),
    (0x772, "SRS (alt)"),
    (0x773, "BCM (alt)"),
    (0x774, "IPC (alt)"),
    (0x775, "HVAC (alt)"),
    (0x776, "Gateway (alt)"),
];

/// Name of the node at `address`, accepting either its request or response form
#[must_use]
pub fn node_name(address: u16) -> Option<&'static str> {
    let request = address & !DIRECTION_BIT;
    NODE_NAMES.iter().find(|(addr, _)| *addr == request).map(|(_, name)| *name)
}

// =============================================================================
// CATALOG
// =============================================================================

/// One addressable signal
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub key: SignalKey,
    pub label: String,
    pub description: String,
    pub decoder: Decoder,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(key: SignalKey, label: &str, description: &str, decoder: Decoder) -> Self {
        Self { key, label: label.to_string(), description: description.to_string(), decoder }
    }
}

/// Ordered, immutable signal registry with keyed lookup
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    index: HashMap<SignalKey, usize>,
}

impl Catalog {
    /// Build the catalog from the built-in PID and DID tables
    #[must_use]
    pub fn standard() -> Self {
        let declare = |service: u8, table: &[Declaration]| -> Vec<CatalogEntry> {
            table
                .iter()
                .map(|&(parameter, label, description, decoder)| {
                    CatalogEntry::new(
                        SignalKey::new(DEFAULT_NODE, service, parameter),
                        label,
                        description,
                        decoder,
                    )
                })
                .collect()
        };

        let mut entries = declare(SERVICE_CURRENT_DATA, PID_TABLE);
        entries.extend(declare(SERVICE_READ_BY_ID, DID_TABLE));
        Self::from_entries(entries)
    }

    /// Build a catalog from entries in display order; later duplicates are dropped
    #[must_use]
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        let mut kept = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for entry in entries {
            if index.contains_key(&entry.key) {
                warn!("Dropping duplicate catalog entry {} ({})", entry.key, entry.label);
                continue;
            }
            index.insert(entry.key, kept.len());
            kept.push(entry);
        }

        Self { entries: kept, index }
    }

    /// All entries in display order
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// All keys in display order
    pub fn keys(&self) -> impl Iterator<Item = SignalKey> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    #[must_use]
    pub fn lookup(&self, node: u16, service: u8, parameter: u32) -> Option<&CatalogEntry> {
        self.get(&SignalKey::new(node, service, parameter))
    }

    #[must_use]
    pub fn get(&self, key: &SignalKey) -> Option<&CatalogEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Position of `key` in display order
    #[must_use]
    pub fn index_of(&self, key: &SignalKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    #[must_use]
    pub fn contains(&self, key: &SignalKey) -> bool {
        self.index.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_one_entries_come_first() {
        let catalog = Catalog::standard();
        let services: Vec<u8> = catalog.keys().map(|k| k.service).collect();
        let first_did = services.iter().position(|&s| s == SERVICE_READ_BY_ID).unwrap();

        assert!(services[..first_did].iter().all(|&s| s == SERVICE_CURRENT_DATA));
        assert!(services[first_did..].iter().all(|&s| s == SERVICE_READ_BY_ID));
        assert_eq!(catalog.entries()[0].label, "Calculated Engine Load");
        assert_eq!(catalog.entries()[first_did].label, "ECU Identification");
    }

    #[test]
    fn test_duplicate_declaration_dropped() {
        let catalog = Catalog::standard();
        let aat = catalog.lookup(DEFAULT_NODE, SERVICE_CURRENT_DATA, 0x46).unwrap();
        assert_eq!(aat.label, "AAT");
        assert_eq!(catalog.len(), PID_TABLE.len() + DID_TABLE.len() - 1);
    }

    #[test]
    fn test_lookup_every_entry() {
        let catalog = Catalog::standard();
        for (i, entry) in catalog.entries().iter().enumerate() {
            let found = catalog.lookup(entry.key.node, entry.key.service, entry.key.parameter);
            assert_eq!(found, Some(entry));
            assert_eq!(catalog.index_of(&entry.key), Some(i));
        }
    }

    #[test]
    fn test_lookup_miss() {
        let catalog = Catalog::standard();
        assert!(catalog.lookup(0x7E8, SERVICE_CURRENT_DATA, 0x0C).is_none());
        assert!(catalog.lookup(DEFAULT_NODE, SERVICE_READ_BY_ID, 0x0C).is_none());
        assert!(catalog.lookup(DEFAULT_NODE, SERVICE_CURRENT_DATA, 0xFF).is_none());
    }

    #[test]
    fn test_iteration_is_restartable() {
        let catalog = Catalog::standard();
        let mut a = catalog.keys();
        let mut b = catalog.keys();
        a.next();
        a.next();
        assert_eq!(b.next(), catalog.entries().first().map(|e| e.key));
    }

    #[test]
    fn test_rpm_decoder() {
        assert_eq!(Decoder::Rpm.decode(&[0x1A, 0xF8]).unwrap(), "1726 rpm");
        // quarter-rpm ties round to even
        assert_eq!(Decoder::Rpm.decode(&[0x00, 0x02]).unwrap(), "0 rpm");
        assert_eq!(Decoder::Rpm.decode(&[0x00, 0x0A]).unwrap(), "2 rpm");
        assert!(matches!(
            Decoder::Rpm.decode(&[0x1A]),
            Err(DecodeError::ShortPayload { need: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_scalar_decoders() {
        assert_eq!(Decoder::Temperature.decode(&[0]).unwrap(), "-40 °C");
        assert_eq!(Decoder::Temperature.decode(&[130]).unwrap(), "90 °C");
        assert_eq!(Decoder::Percent.decode(&[255]).unwrap(), "100.0 %");
        assert_eq!(Decoder::Voltage.decode(&[142]).unwrap(), "14.2 V");
        assert_eq!(Decoder::YesNo.decode(&[0]).unwrap(), "No");
        assert_eq!(Decoder::Hex.decode(&[0xDE, 0xAD]).unwrap(), "DE AD");
        assert_eq!(Decoder::Hex.decode(&[]).unwrap(), "");
        assert!(Decoder::Speed.decode(&[]).is_err());
    }

    #[test]
    fn test_node_name_accepts_response_address() {
        assert_eq!(node_name(0x7E0), Some("ECM"));
        assert_eq!(node_name(0x7E8), Some("ECM"));
        assert_eq!(node_name(0x123), None);
    }
}
