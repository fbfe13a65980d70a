use std::{fmt, str::FromStr};

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine as _,
};

use crate::ton::TonCodecError;

const BOUNCEABLE_TAG: u8 = 0x11;
const NON_BOUNCEABLE_TAG: u8 = 0x51;
const TEST_ONLY_FLAG: u8 = 0x80;

/// Internal TON account address. Two addresses are equal when workchain and account hash
/// match, whatever textual form they were parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TonAddress {
    pub workchain: i32,
    pub hash: [u8; 32],
}

impl TonAddress {
    pub fn new(workchain: i32, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// Parses either the raw `<workchain>:<hex>` form or the 48 character user-friendly form.
    pub fn parse(input: &str) -> Result<Self, TonCodecError> {
        let input = input.trim();
        if input.contains(':') {
            Self::parse_raw(input)
        } else {
            Self::parse_friendly(input)
        }
    }

    fn parse_raw(input: &str) -> Result<Self, TonCodecError> {
        let (wc, hash_hex) = input
            .split_once(':')
            .ok_or_else(|| TonCodecError::InvalidAddress(input.to_string()))?;
        let workchain = wc
            .parse::<i32>()
            .map_err(|_| TonCodecError::InvalidAddress(format!("bad workchain in {}", input)))?;
        let bytes = hex::decode(hash_hex).map_err(|_| TonCodecError::InvalidAddress(input.to_string()))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TonCodecError::InvalidAddress(format!("hash must be 32 bytes: {}", input)))?;

        Ok(Self { workchain, hash })
    }

    fn parse_friendly(input: &str) -> Result<Self, TonCodecError> {
        if input.len() != 48 {
            return Err(TonCodecError::InvalidAddress(input.to_string()));
        }
        let bytes = if input.contains('-') || input.contains('_') {
            URL_SAFE.decode(input)
        } else {
            STANDARD.decode(input)
        }
        .map_err(|_| TonCodecError::InvalidAddress(input.to_string()))?;

        if bytes.len() != 36 {
            return Err(TonCodecError::InvalidAddress(input.to_string()));
        }

        let tag = bytes[0] & !TEST_ONLY_FLAG;
        if tag != BOUNCEABLE_TAG && tag != NON_BOUNCEABLE_TAG {
            return Err(TonCodecError::InvalidAddress(format!("unknown tag in {}", input)));
        }

        let crc = crc16_xmodem(&bytes[..34]);
        if crc != [bytes[34], bytes[35]] {
            return Err(TonCodecError::InvalidAddress(format!("checksum mismatch in {}", input)));
        }

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);

        Ok(Self {
            workchain: bytes[1] as i8 as i32,
            hash,
        })
    }

    /// Canonical `<workchain>:<hex>` form used for storage and comparison.
    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }

    /// User-friendly base64url form.
    pub fn to_friendly(&self, bounceable: bool, test_only: bool) -> String {
        let mut bytes = Vec::with_capacity(36);
        let mut tag = if bounceable { BOUNCEABLE_TAG } else { NON_BOUNCEABLE_TAG };
        if test_only {
            tag |= TEST_ONLY_FLAG;
        }
        bytes.push(tag);
        bytes.push(self.workchain as i8 as u8);
        bytes.extend_from_slice(&self.hash);
        let crc = crc16_xmodem(&bytes);
        bytes.extend_from_slice(&crc);

        URL_SAFE.encode(bytes)
    }
}

impl fmt::Display for TonAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

impl FromStr for TonAddress {
    type Err = TonCodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// CRC16-XModem checksum, big-endian.
fn crc16_xmodem(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0;

    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }

    crc.to_be_bytes()
}
