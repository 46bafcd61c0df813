//! Test-only FIT stream builder
//!
//! Produces small but valid FIT files (header, definition and data messages,
//! CRCs) so the decoder can be exercised end to end without binary assets.

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z)
pub(crate) const FIT_EPOCH_OFFSET: i64 = 631_065_600;

const MESG_SESSION: u16 = 18;
const MESG_RECORD: u16 = 20;

const BASE_ENUM: u8 = 0x00;
const BASE_UINT8: u8 = 0x02;
const BASE_SINT32: u8 = 0x85;
const BASE_UINT16: u8 = 0x84;
const BASE_UINT32: u8 = 0x86;

/// One `record` message; `None` fields are left out of its definition
#[derive(Debug, Clone, Default)]
pub(crate) struct FixtureRecord {
    timestamp: Option<u32>,
    position: Option<(i32, i32)>,
    altitude_m: Option<f64>,
    heart_rate: Option<u8>,
    cadence: Option<u8>,
    distance_m: Option<f64>,
    speed_mps: Option<f64>,
    power: Option<u16>,
}

impl FixtureRecord {
    /// Record at `fit_seconds` past the FIT epoch
    pub(crate) fn at(fit_seconds: u32) -> Self {
        Self {
            timestamp: Some(fit_seconds),
            ..Default::default()
        }
    }

    pub(crate) fn untimed() -> Self {
        Self::default()
    }

    pub(crate) fn position(mut self, lat_semicircles: i32, long_semicircles: i32) -> Self {
        self.position = Some((lat_semicircles, long_semicircles));
        self
    }

    pub(crate) fn altitude(mut self, meters: f64) -> Self {
        self.altitude_m = Some(meters);
        self
    }

    pub(crate) fn heart_rate(mut self, bpm: u8) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    pub(crate) fn cadence(mut self, rpm: u8) -> Self {
        self.cadence = Some(rpm);
        self
    }

    pub(crate) fn distance(mut self, meters: f64) -> Self {
        self.distance_m = Some(meters);
        self
    }

    pub(crate) fn speed(mut self, mps: f64) -> Self {
        self.speed_mps = Some(mps);
        self
    }

    pub(crate) fn power(mut self, watts: u16) -> Self {
        self.power = Some(watts);
        self
    }

    fn fields(&self) -> Vec<(u8, u8, Vec<u8>)> {
        let mut fields = Vec::new();
        if let Some(ts) = self.timestamp {
            fields.push((253, BASE_UINT32, ts.to_le_bytes().to_vec()));
        }
        if let Some((lat, long)) = self.position {
            fields.push((0, BASE_SINT32, lat.to_le_bytes().to_vec()));
            fields.push((1, BASE_SINT32, long.to_le_bytes().to_vec()));
        }
        if let Some(alt) = self.altitude_m {
            let raw = ((alt + 500.0) * 5.0).round() as u16;
            fields.push((2, BASE_UINT16, raw.to_le_bytes().to_vec()));
        }
        if let Some(hr) = self.heart_rate {
            fields.push((3, BASE_UINT8, vec![hr]));
        }
        if let Some(cad) = self.cadence {
            fields.push((4, BASE_UINT8, vec![cad]));
        }
        if let Some(dist) = self.distance_m {
            let raw = (dist * 100.0).round() as u32;
            fields.push((5, BASE_UINT32, raw.to_le_bytes().to_vec()));
        }
        if let Some(speed) = self.speed_mps {
            let raw = (speed * 1000.0).round() as u16;
            fields.push((6, BASE_UINT16, raw.to_le_bytes().to_vec()));
        }
        if let Some(power) = self.power {
            fields.push((7, BASE_UINT16, power.to_le_bytes().to_vec()));
        }
        fields
    }
}

/// Accumulates messages and produces the final FIT byte stream
#[derive(Debug, Default)]
pub(crate) struct FitFixture {
    data: Vec<u8>,
}

impl FitFixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(mut self, record: FixtureRecord) -> Self {
        self.message(MESG_RECORD, record.fields());
        self
    }

    /// Session message; `sport` uses the FIT sport enum (1 = running, 2 = cycling)
    pub(crate) fn session(mut self, sport: Option<u8>, total_timer_s: Option<f64>) -> Self {
        let mut fields = Vec::new();
        if let Some(sport) = sport {
            fields.push((5, BASE_ENUM, vec![sport]));
        }
        if let Some(timer) = total_timer_s {
            let raw = (timer * 1000.0).round() as u32;
            fields.push((8, BASE_UINT32, raw.to_le_bytes().to_vec()));
        }
        self.message(MESG_SESSION, fields);
        self
    }

    /// Each message gets its own definition on local type 0
    fn message(&mut self, global: u16, fields: Vec<(u8, u8, Vec<u8>)>) {
        self.data.push(0x40);
        self.data.push(0);
        self.data.push(0);
        self.data.extend_from_slice(&global.to_le_bytes());
        self.data.push(fields.len() as u8);
        for (num, base_type, bytes) in &fields {
            self.data.push(*num);
            self.data.push(bytes.len() as u8);
            self.data.push(*base_type);
        }

        self.data.push(0x00);
        for (_, _, bytes) in &fields {
            self.data.extend_from_slice(bytes);
        }
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 16);
        out.push(14);
        out.push(0x20);
        out.extend_from_slice(&2132u16.to_le_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(b".FIT");
        let header_crc = crc(&out);
        out.extend_from_slice(&header_crc.to_le_bytes());

        out.extend_from_slice(&self.data);
        let file_crc = crc(&out);
        out.extend_from_slice(&file_crc.to_le_bytes());
        out
    }
}

fn crc(data: &[u8]) -> u16 {
    const CRC_TABLE: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];

    data.iter().fold(0u16, |crc, byte| {
        let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
        let mut crc = (crc >> 4) & 0x0FFF;
        crc ^= tmp ^ CRC_TABLE[(byte & 0xF) as usize];
        tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
    })
}
