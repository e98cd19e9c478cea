//! Pack/unpack for the 64-bit RAID bus opcode.
//!
//! Layout (MSB first), authoritative per the bus protocol:
//!
//! ```text
//! 63      56 55      48 47      40 39    33 32     31           0
//! +---------+----------+----------+------+--------+-------------+
//! | req_ty  | nblocks  | disk_num | rsvd | status | block_id    |
//! +---------+----------+----------+------+--------+-------------+
//!     8          8          8        7       1          32
//! ```
//!
//! 8 + 8 + 8 + 7 + 1 + 32 == 64 exactly. The reserved field is 7 bits,
//! not 6.
use bitfield::bitfield;

bitfield! {
    struct Opcode(u64);
    impl Debug;
    u8, request_type, set_request_type: 63, 56;
    u8, number_of_blocks, set_number_of_blocks: 55, 48;
    u8, disk_number, set_disk_number: 47, 40;
    u8, reserved, set_reserved: 39, 33;
    bool, status, set_status: 32;
    u32, block_id, set_block_id: 31, 0;
}

/// Bus request types the core issues. Numeric values are an
/// implementation choice (spec.md does not fix them); see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Init,
    Format,
    Read,
    Write,
    Close,
    Status,
}

impl RequestType {
    fn to_u8(self) -> u8 {
        match self {
            RequestType::Init => 0,
            RequestType::Format => 1,
            RequestType::Read => 2,
            RequestType::Write => 3,
            RequestType::Close => 4,
            RequestType::Status => 5,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(RequestType::Init),
            1 => Some(RequestType::Format),
            2 => Some(RequestType::Read),
            3 => Some(RequestType::Write),
            4 => Some(RequestType::Close),
            5 => Some(RequestType::Status),
            _ => None,
        }
    }
}

/// block_id value a STATUS response uses to report a failed disk.
pub const STATUS_FAILED: u32 = 2;

/// The seven logical fields of a bus request, before packing.
#[derive(Debug, Clone, Copy)]
pub struct RequestFields {
    pub request_type: RequestType,
    pub number_of_blocks: u8,
    pub disk_number: u8,
    pub block_id: u32,
}

/// The fields a bus response carries, after unpacking.
#[derive(Debug, Clone, Copy)]
pub struct ResponseFields {
    pub request_type: Option<RequestType>,
    pub number_of_blocks: u8,
    pub disk_number: u8,
    pub status_ok: bool,
    pub block_id: u32,
}

/// Packs request fields into the 64-bit opcode word. The status bit is
/// always clear on a request; reserved bits are always zero.
pub fn encode(fields: RequestFields) -> u64 {
    let mut op = Opcode(0);
    op.set_request_type(fields.request_type.to_u8());
    op.set_number_of_blocks(fields.number_of_blocks);
    op.set_disk_number(fields.disk_number);
    op.set_reserved(0);
    op.set_status(false);
    op.set_block_id(fields.block_id);
    op.0
}

/// Unpacks a 64-bit response word into its fields. Never fails: an
/// unrecognized request_type byte decodes to `None`, left for the caller
/// (`check_response`) to treat as a mismatch.
pub fn decode(word: u64) -> ResponseFields {
    let op = Opcode(word);
    ResponseFields {
        request_type: RequestType::from_u8(op.request_type()),
        number_of_blocks: op.number_of_blocks(),
        disk_number: op.disk_number(),
        status_ok: !op.status(),
        block_id: op.block_id(),
    }
}

/// Validates a response against the request that produced it: the
/// echoed `request_type`, `number_of_blocks`, and `disk_number` fields
/// must match, and the status bit must be clear.
///
/// `block_id` is checked as an echo for every request type except
/// STATUS, whose response repurposes `block_id` to carry the addressed
/// disk's health (spec.md §4.5/§6) rather than echoing the request.
pub fn check_response(
    request: RequestFields,
    response: ResponseFields,
) -> Result<(), crate::error::BusError> {
    use crate::error::BusError;

    if response.request_type != Some(request.request_type) {
        return Err(BusError::ResponseMismatch {
            field: "request_type",
        });
    }
    if response.number_of_blocks != request.number_of_blocks {
        return Err(BusError::ResponseMismatch {
            field: "number_of_blocks",
        });
    }
    if response.disk_number != request.disk_number {
        return Err(BusError::ResponseMismatch {
            field: "disk_number",
        });
    }
    if !matches!(request.request_type, RequestType::Status) && response.block_id != request.block_id
    {
        return Err(BusError::ResponseMismatch { field: "block_id" });
    }
    if !response.status_ok {
        return Err(BusError::StatusFailure);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_field() {
        let fields = RequestFields {
            request_type: RequestType::Write,
            number_of_blocks: 1,
            disk_number: 7,
            block_id: 0xDEAD,
        };
        let word = encode(fields);
        let decoded = decode(word);
        assert_eq!(decoded.request_type, Some(RequestType::Write));
        assert_eq!(decoded.number_of_blocks, 1);
        assert_eq!(decoded.disk_number, 7);
        assert_eq!(decoded.block_id, 0xDEAD);
        assert!(decoded.status_ok);
    }

    #[test]
    fn status_bit_flips_status_ok() {
        let mut op = Opcode(encode(RequestFields {
            request_type: RequestType::Status,
            number_of_blocks: 0,
            disk_number: 3,
            block_id: STATUS_FAILED,
        }));
        op.set_status(true);
        let decoded = decode(op.0);
        assert!(!decoded.status_ok);
        assert_eq!(decoded.block_id, STATUS_FAILED);
    }

    #[test]
    fn reserved_field_is_seven_bits_not_six() {
        let mut op = Opcode(0);
        op.set_reserved(0x7F);
        assert_eq!(op.reserved(), 0x7F);
        // Bit 32 (status) must be untouched by a full reserved-field write.
        assert!(!op.status());
    }

    #[test]
    fn unrecognized_request_type_decodes_to_none() {
        let mut op = Opcode(0);
        op.set_request_type(0xFF);
        assert_eq!(decode(op.0).request_type, None);
    }

    #[test]
    fn check_response_rejects_mismatched_disk_number() {
        let request = RequestFields {
            request_type: RequestType::Read,
            number_of_blocks: 1,
            disk_number: 2,
            block_id: 10,
        };
        let response = decode(encode(RequestFields {
            disk_number: 3,
            ..request
        }));
        assert!(check_response(request, response).is_err());
    }

    #[test]
    fn check_response_allows_status_block_id_to_diverge() {
        let request = RequestFields {
            request_type: RequestType::Status,
            number_of_blocks: 0,
            disk_number: 4,
            block_id: 0,
        };
        let response = decode(encode(RequestFields {
            block_id: STATUS_FAILED,
            ..request
        }));
        assert!(check_response(request, response).is_ok());
    }
}
