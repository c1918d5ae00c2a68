//! Compute Budget program instructions used to attach a priority fee.

use crate::transaction::SolInstruction;

/// `ComputeBudget111111111111111111111111111111`
pub const COMPUTE_BUDGET_PROGRAM_ID: [u8; 32] = [
    0x03, 0x06, 0x46, 0x6f, 0xe5, 0x21, 0x17, 0x32, 0xff, 0xec, 0xad, 0xba, 0x72, 0xc3, 0x9b,
    0xe7, 0xbc, 0x8c, 0xe5, 0xbb, 0xc5, 0xf7, 0x12, 0x6b, 0x2c, 0x43, 0x9b, 0x3a, 0x40, 0x00,
    0x00, 0x00,
];

const SET_COMPUTE_UNIT_LIMIT: u8 = 2;
const SET_COMPUTE_UNIT_PRICE: u8 = 3;

/// Priority fee attached to every transaction we build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityFee {
    /// Price per compute unit, in micro-lamports.
    pub unit_price: u64,
    /// Compute unit limit.
    pub unit_limit: u32,
}

impl PriorityFee {
    /// Instructions in the order they are placed at the head of a message.
    pub fn instructions(&self) -> [SolInstruction; 2] {
        [
            set_compute_unit_price(self.unit_price),
            set_compute_unit_limit(self.unit_limit),
        ]
    }
}

/// `SetComputeUnitLimit(u32)`.
pub fn set_compute_unit_limit(units: u32) -> SolInstruction {
    let mut data = Vec::with_capacity(5);
    data.push(SET_COMPUTE_UNIT_LIMIT);
    data.extend_from_slice(&units.to_le_bytes());
    SolInstruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: Vec::new(),
        data,
    }
}

/// `SetComputeUnitPrice(u64)`, in micro-lamports.
pub fn set_compute_unit_price(micro_lamports: u64) -> SolInstruction {
    let mut data = Vec::with_capacity(9);
    data.push(SET_COMPUTE_UNIT_PRICE);
    data.extend_from_slice(&micro_lamports.to_le_bytes());
    SolInstruction {
        program_id: COMPUTE_BUDGET_PROGRAM_ID,
        accounts: Vec::new(),
        data,
    }
}
