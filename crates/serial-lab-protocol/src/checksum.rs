use serial_lab_abstract::ChecksumKind;

/// Running 8-bit frame checksum.
///
/// Starts at zero, is fed the length byte and then each payload byte in
/// order. The XOR variant detects any single flipped bit; the additive
/// variant is kept for links that were built around a byte sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    kind: ChecksumKind,
    value: u8,
}

impl Checksum {
    pub fn new(kind: ChecksumKind) -> Self {
        Self { kind, value: 0 }
    }

    pub fn update(&mut self, byte: u8) {
        self.value = match self.kind {
            ChecksumKind::Xor => self.value ^ byte,
            ChecksumKind::Additive => self.value.wrapping_add(byte),
        };
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }

    pub fn value(&self) -> u8 {
        self.value
    }
}

/// Checksum of a whole frame body in one call.
pub fn frame_checksum(kind: ChecksumKind, length: u8, payload: &[u8]) -> u8 {
    let mut sum = Checksum::new(kind);
    sum.update(length);
    for &b in payload {
        sum.update(b);
    }
    sum.value()
}
