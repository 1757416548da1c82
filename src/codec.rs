//! # Register Codec
//!
//! Pure conversions between blocks of 16-bit registers and typed values.
//! Nothing here performs I/O and nothing here keeps state; every function is
//! safe to call from any thread.
//!
//! ## Byte Model
//!
//! A register block is first turned into a byte stream, two bytes per
//! register in register order. With default flags each register contributes
//! its low byte first; `swap_bytes` makes it contribute its high byte first.
//!
//! - Multi-register numbers read that stream as a little-endian integer (or
//!   IEEE-754 pattern), so the first register is the least significant word.
//!   `swap_words` reverses the register order before the stream is built.
//! - Byte arrays, ASCII and HEX strings consume the stream directly;
//!   `swap_words` never applies to them.
//! - Bit arrays (`Bits16`) map the 16 bits of one register, bit 0 first, and
//!   ignore both flags.
//!
//! | flags | registers for `0x12345678` |
//! |---|---|
//! | none | `[0x5678, 0x1234]` |
//! | `swap_words` | `[0x1234, 0x5678]` |
//! | `swap_bytes` | `[0x7856, 0x3412]` |
//! | both | `[0x3412, 0x7856]` |
//!
//! ## Example
//!
//! ```rust
//! use voltage_modbus_typed::codec::{self, ByteOrderFlags, TypedValue, ValueType};
//!
//! let flags = ByteOrderFlags::default();
//! let values = codec::decode_array(&[0x0001, 0x0000, 0x0002, 0x0000], ValueType::Int32, flags).unwrap();
//! assert_eq!(values, vec![TypedValue::Int32(1), TypedValue::Int32(2)]);
//!
//! let words = codec::encode(&TypedValue::Float32(1.5), ValueType::Float32, flags).unwrap();
//! assert_eq!(codec::decode(&words, ValueType::Float32, 1, flags).unwrap(), TypedValue::Float32(1.5));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CodecError, ModbusError, ValidationError};

/// Byte and word order conventions of one connection
///
/// The flags are fixed when a [`TypedClient`](crate::dispatch::TypedClient)
/// is built and apply to every multi-byte conversion it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ByteOrderFlags {
    /// Reverse the two bytes inside each register
    #[serde(default)]
    pub swap_bytes: bool,
    /// Reverse the register order inside multi-register values
    #[serde(default)]
    pub swap_words: bool,
}

impl ByteOrderFlags {
    pub const fn new(swap_bytes: bool, swap_words: bool) -> Self {
        Self { swap_bytes, swap_words }
    }

    /// Every flag combination, mostly useful for exhaustive checks
    pub const ALL: [ByteOrderFlags; 4] = [
        ByteOrderFlags::new(false, false),
        ByteOrderFlags::new(false, true),
        ByteOrderFlags::new(true, false),
        ByteOrderFlags::new(true, true),
    ];

    fn word_bytes(self, word: u16) -> [u8; 2] {
        if self.swap_bytes {
            word.to_be_bytes()
        } else {
            word.to_le_bytes()
        }
    }

    fn word_from_bytes(self, bytes: [u8; 2]) -> u16 {
        if self.swap_bytes {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        }
    }

    /// Build the little-endian byte image of an `N`-byte value.
    ///
    /// Only the first `N / 2` words are consulted.
    fn gather<const N: usize>(self, words: &[u16]) -> [u8; N] {
        let slots = N / 2;
        let mut out = [0u8; N];
        for (i, &word) in words.iter().take(slots).enumerate() {
            let slot = if self.swap_words { slots - 1 - i } else { i };
            out[slot * 2..slot * 2 + 2].copy_from_slice(&self.word_bytes(word));
        }
        out
    }

    /// Inverse of [`gather`](Self::gather).
    fn scatter<const N: usize>(self, bytes: [u8; N]) -> Vec<u16> {
        let mut words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| self.word_from_bytes([pair[0], pair[1]]))
            .collect();
        if self.swap_words {
            words.reverse();
        }
        words
    }

    fn stream(self, words: &[u16], len: usize) -> Vec<u8> {
        words.iter().flat_map(|&word| self.word_bytes(word)).take(len).collect()
    }

    fn pack(self, bytes: &[u8]) -> Vec<u16> {
        bytes
            .chunks(2)
            .map(|pair| self.word_from_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
            .collect()
    }
}

impl fmt::Display for ByteOrderFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "swap_bytes={}, swap_words={}", self.swap_bytes, self.swap_words)
    }
}

/// Register interpretation requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// One register viewed as 16 booleans
    #[serde(rename = "bits")]
    Bits16,
    /// One character per byte, count = characters
    #[serde(rename = "string")]
    AsciiString,
    /// Two uppercase hex digits per byte, count = bytes
    #[serde(rename = "hex")]
    HexString,
    /// Raw bytes, count = bytes
    #[serde(rename = "byte")]
    Byte,
    #[serde(rename = "short")]
    Int16,
    #[serde(rename = "ushort")]
    UInt16,
    #[serde(rename = "int")]
    Int32,
    #[serde(rename = "uint")]
    UInt32,
    #[serde(rename = "float")]
    Float32,
    #[serde(rename = "double")]
    Float64,
    #[serde(rename = "long")]
    Int64,
    #[serde(rename = "ulong")]
    UInt64,
}

impl ValueType {
    pub const ALL: [ValueType; 12] = [
        ValueType::Bits16,
        ValueType::AsciiString,
        ValueType::HexString,
        ValueType::Byte,
        ValueType::Int16,
        ValueType::UInt16,
        ValueType::Int32,
        ValueType::UInt32,
        ValueType::Float32,
        ValueType::Float64,
        ValueType::Int64,
        ValueType::UInt64,
    ];

    /// Registers consumed by one element.
    ///
    /// Packed types (byte, string, hex) share registers between two units and
    /// report 1 here; use [`registers_for`](Self::registers_for) for spans.
    pub fn registers_per_element(self) -> u16 {
        match self {
            ValueType::Bits16
            | ValueType::AsciiString
            | ValueType::HexString
            | ValueType::Byte
            | ValueType::Int16
            | ValueType::UInt16 => 1,
            ValueType::Int32 | ValueType::UInt32 | ValueType::Float32 => 2,
            ValueType::Int64 | ValueType::UInt64 | ValueType::Float64 => 4,
        }
    }

    /// Registers needed to hold `count` units of this type
    pub fn registers_for(self, count: u16) -> u32 {
        if self.is_packed() {
            (count as u32 + 1) / 2
        } else {
            count as u32 * self.registers_per_element() as u32
        }
    }

    /// Byte arrays and strings: `count` measures bytes inside one value
    pub fn is_packed(self) -> bool {
        matches!(self, ValueType::AsciiString | ValueType::HexString | ValueType::Byte)
    }

    /// 16/32/64-bit integers and floats
    pub fn is_numeric(self) -> bool {
        !self.is_packed() && self != ValueType::Bits16
    }

    /// Legacy tag of this type
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Bits16 => "bits",
            ValueType::AsciiString => "string",
            ValueType::HexString => "hex",
            ValueType::Byte => "byte",
            ValueType::Int16 => "short",
            ValueType::UInt16 => "ushort",
            ValueType::Int32 => "int",
            ValueType::UInt32 => "uint",
            ValueType::Float32 => "float",
            ValueType::Float64 => "double",
            ValueType::Int64 => "long",
            ValueType::UInt64 => "ulong",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value_type = match s.trim().to_ascii_lowercase().as_str() {
            "bits" | "bits16" => ValueType::Bits16,
            "string" | "ascii" => ValueType::AsciiString,
            "hex" => ValueType::HexString,
            "byte" | "bytes" => ValueType::Byte,
            "short" | "int16" => ValueType::Int16,
            "ushort" | "uint16" => ValueType::UInt16,
            "int" | "int32" => ValueType::Int32,
            "uint" | "uint32" => ValueType::UInt32,
            "float" | "float32" => ValueType::Float32,
            "double" | "float64" => ValueType::Float64,
            "long" | "int64" => ValueType::Int64,
            "ulong" | "uint64" => ValueType::UInt64,
            _ => return Err(ValidationError::UnknownValueType { tag: s.to_string() }.into()),
        };
        Ok(value_type)
    }
}

/// A decoded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    Bits(Vec<bool>),
    Ascii(String),
    Hex(String),
    Bytes(Vec<u8>),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
    Float64(f64),
    Int64(i64),
    UInt64(u64),
}

impl TypedValue {
    /// The type tag this value encodes under
    pub fn value_type(&self) -> ValueType {
        match self {
            TypedValue::Bits(_) => ValueType::Bits16,
            TypedValue::Ascii(_) => ValueType::AsciiString,
            TypedValue::Hex(_) => ValueType::HexString,
            TypedValue::Bytes(_) => ValueType::Byte,
            TypedValue::Int16(_) => ValueType::Int16,
            TypedValue::UInt16(_) => ValueType::UInt16,
            TypedValue::Int32(_) => ValueType::Int32,
            TypedValue::UInt32(_) => ValueType::UInt32,
            TypedValue::Float32(_) => ValueType::Float32,
            TypedValue::Float64(_) => ValueType::Float64,
            TypedValue::Int64(_) => ValueType::Int64,
            TypedValue::UInt64(_) => ValueType::UInt64,
        }
    }

    /// Plain JSON rendering (numbers, strings, arrays) for output sinks
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            TypedValue::Bits(bits) => json!(bits),
            TypedValue::Ascii(text) | TypedValue::Hex(text) => json!(text),
            TypedValue::Bytes(bytes) => json!(bytes),
            TypedValue::Int16(v) => json!(v),
            TypedValue::UInt16(v) => json!(v),
            TypedValue::Int32(v) => json!(v),
            TypedValue::UInt32(v) => json!(v),
            TypedValue::Float32(v) => json!(v),
            TypedValue::Float64(v) => json!(v),
            TypedValue::Int64(v) => json!(v),
            TypedValue::UInt64(v) => json!(v),
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypedValue::Bits(bits) => {
                // bit 15 on the left, like a binary literal
                let text: String = bits.iter().rev().map(|&bit| if bit { '1' } else { '0' }).collect();
                f.write_str(&text)
            },
            TypedValue::Ascii(text) => write!(f, "{:?}", text),
            TypedValue::Hex(text) => f.write_str(text),
            TypedValue::Bytes(bytes) => f.write_str(&crate::utils::format::bytes_to_hex(bytes)),
            TypedValue::Int16(v) => write!(f, "{}", v),
            TypedValue::UInt16(v) => write!(f, "{}", v),
            TypedValue::Int32(v) => write!(f, "{}", v),
            TypedValue::UInt32(v) => write!(f, "{}", v),
            TypedValue::Float32(v) => write!(f, "{}", v),
            TypedValue::Float64(v) => write!(f, "{}", v),
            TypedValue::Int64(v) => write!(f, "{}", v),
            TypedValue::UInt64(v) => write!(f, "{}", v),
        }
    }
}

/// Native numeric types that map onto whole registers
pub trait RegisterValue: Copy + Send + Sync + 'static {
    const VALUE_TYPE: ValueType;

    /// Decode from exactly `registers_per_element` words
    fn from_words(words: &[u16], flags: ByteOrderFlags) -> Self;

    fn to_words(self, flags: ByteOrderFlags) -> Vec<u16>;

    fn into_typed(self) -> TypedValue;

    fn from_typed(value: &TypedValue) -> Option<Self>;
}

macro_rules! register_value {
    ($ty:ty, $variant:ident, $bytes:expr) => {
        impl RegisterValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::$variant;

            fn from_words(words: &[u16], flags: ByteOrderFlags) -> Self {
                <$ty>::from_le_bytes(flags.gather::<$bytes>(words))
            }

            fn to_words(self, flags: ByteOrderFlags) -> Vec<u16> {
                flags.scatter(self.to_le_bytes())
            }

            fn into_typed(self) -> TypedValue {
                TypedValue::$variant(self)
            }

            fn from_typed(value: &TypedValue) -> Option<Self> {
                match value {
                    TypedValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

register_value!(i16, Int16, 2);
register_value!(u16, UInt16, 2);
register_value!(i32, Int32, 4);
register_value!(u32, UInt32, 4);
register_value!(f32, Float32, 4);
register_value!(i64, Int64, 8);
register_value!(u64, UInt64, 8);
register_value!(f64, Float64, 8);

fn expected_registers(value_type: ValueType, count: usize) -> usize {
    if value_type.is_packed() {
        (count + 1) / 2
    } else {
        value_type.registers_per_element() as usize
    }
}

/// Decode one value from a register block.
///
/// `count` is the byte / character count for packed types and is ignored
/// for numeric types and bit arrays, which decode a single element. The
/// block must hold exactly the registers that value occupies.
pub fn decode(
    words: &[u16],
    value_type: ValueType,
    count: u16,
    flags: ByteOrderFlags,
) -> Result<TypedValue, CodecError> {
    decode_units(words, value_type, count as usize, flags)
}

fn decode_units(
    words: &[u16],
    value_type: ValueType,
    count: usize,
    flags: ByteOrderFlags,
) -> Result<TypedValue, CodecError> {
    let expected = expected_registers(value_type, count);
    if words.len() != expected {
        return Err(CodecError::WrongRegisterCount { value_type, expected, actual: words.len() });
    }

    let value = match value_type {
        ValueType::Bits16 => TypedValue::Bits((0..16).map(|bit| (words[0] >> bit) & 1 == 1).collect()),
        ValueType::Byte => TypedValue::Bytes(flags.stream(words, count)),
        ValueType::AsciiString => {
            let mut text: String = flags.stream(words, count).into_iter().map(char::from).collect();
            let trimmed = text.trim_end_matches('\0').len();
            text.truncate(trimmed);
            TypedValue::Ascii(text)
        },
        ValueType::HexString => TypedValue::Hex(hex::encode_upper(flags.stream(words, count))),
        ValueType::Int16 => i16::from_words(words, flags).into_typed(),
        ValueType::UInt16 => u16::from_words(words, flags).into_typed(),
        ValueType::Int32 => i32::from_words(words, flags).into_typed(),
        ValueType::UInt32 => u32::from_words(words, flags).into_typed(),
        ValueType::Float32 => f32::from_words(words, flags).into_typed(),
        ValueType::Float64 => f64::from_words(words, flags).into_typed(),
        ValueType::Int64 => i64::from_words(words, flags).into_typed(),
        ValueType::UInt64 => u64::from_words(words, flags).into_typed(),
    };
    Ok(value)
}

/// Encode one value into registers. Exact inverse of [`decode`].
///
/// Odd byte or character counts are padded with a zero byte.
pub fn encode(value: &TypedValue, value_type: ValueType, flags: ByteOrderFlags) -> Result<Vec<u16>, CodecError> {
    if value.value_type() != value_type {
        return Err(CodecError::TypeMismatch { expected: value_type, actual: value.value_type() });
    }

    let words = match value {
        TypedValue::Bits(bits) => {
            if bits.len() != 16 {
                return Err(CodecError::InvalidBitCount { count: bits.len() });
            }
            let word = bits
                .iter()
                .enumerate()
                .fold(0u16, |acc, (bit, &set)| if set { acc | (1 << bit) } else { acc });
            vec![word]
        },
        TypedValue::Bytes(bytes) => flags.pack(bytes),
        TypedValue::Ascii(text) => {
            let bytes = text
                .chars()
                .map(|ch| u8::try_from(ch).map_err(|_| CodecError::InvalidCharacter { ch }))
                .collect::<Result<Vec<u8>, _>>()?;
            flags.pack(&bytes)
        },
        TypedValue::Hex(text) => {
            let bytes = hex::decode(text.trim())
                .map_err(|e| CodecError::InvalidHex { message: e.to_string() })?;
            flags.pack(&bytes)
        },
        TypedValue::Int16(v) => v.to_words(flags),
        TypedValue::UInt16(v) => v.to_words(flags),
        TypedValue::Int32(v) => v.to_words(flags),
        TypedValue::UInt32(v) => v.to_words(flags),
        TypedValue::Float32(v) => v.to_words(flags),
        TypedValue::Float64(v) => v.to_words(flags),
        TypedValue::Int64(v) => v.to_words(flags),
        TypedValue::UInt64(v) => v.to_words(flags),
    };
    Ok(words)
}

/// Encode and zero-pad to a fixed register span
///
/// Used when a string field occupies a fixed block: re-encoding a decoded
/// ASCII value whose trailing NULs were trimmed restores the original block.
pub fn encode_padded(
    value: &TypedValue,
    value_type: ValueType,
    registers: usize,
    flags: ByteOrderFlags,
) -> Result<Vec<u16>, CodecError> {
    let mut words = encode(value, value_type, flags)?;
    if words.len() > registers {
        return Err(CodecError::WrongRegisterCount { value_type, expected: registers, actual: words.len() });
    }
    words.resize(registers, 0);
    Ok(words)
}

/// Decode consecutive elements from a register block.
///
/// Numeric types and bit arrays split the block into non-overlapping groups
/// of `registers_per_element` words. Packed types decode the whole block as
/// one value of `2 * words.len()` bytes.
pub fn decode_array(words: &[u16], value_type: ValueType, flags: ByteOrderFlags) -> Result<Vec<TypedValue>, CodecError> {
    if value_type.is_packed() {
        return Ok(vec![decode_units(words, value_type, words.len() * 2, flags)?]);
    }

    let per_element = value_type.registers_per_element() as usize;
    if words.len() % per_element != 0 {
        let expected = (words.len() / per_element + 1) * per_element;
        return Err(CodecError::WrongRegisterCount { value_type, expected, actual: words.len() });
    }

    words
        .chunks_exact(per_element)
        .map(|chunk| decode_units(chunk, value_type, 1, flags))
        .collect()
}

/// Encode consecutive elements, preserving order
pub fn encode_array(values: &[TypedValue], value_type: ValueType, flags: ByteOrderFlags) -> Result<Vec<u16>, CodecError> {
    let mut words = Vec::with_capacity(values.len() * value_type.registers_per_element() as usize);
    for value in values {
        words.extend(encode(value, value_type, flags)?);
    }
    Ok(words)
}

/// Decode a block into native numbers
pub fn decode_values<T: RegisterValue>(words: &[u16], flags: ByteOrderFlags) -> Result<Vec<T>, CodecError> {
    let per_element = T::VALUE_TYPE.registers_per_element() as usize;
    if words.len() % per_element != 0 {
        let expected = (words.len() / per_element + 1) * per_element;
        return Err(CodecError::WrongRegisterCount { value_type: T::VALUE_TYPE, expected, actual: words.len() });
    }
    Ok(words.chunks_exact(per_element).map(|chunk| T::from_words(chunk, flags)).collect())
}

/// Encode native numbers into a register block
pub fn encode_values<T: RegisterValue>(values: &[T], flags: ByteOrderFlags) -> Vec<u16> {
    values.iter().flat_map(|value| value.to_words(flags)).collect()
}

macro_rules! array_helpers {
    ($($decode:ident, $encode:ident => $ty:ty;)*) => {
        $(
            #[doc = concat!("Decode a register block into `", stringify!($ty), "` values")]
            pub fn $decode(words: &[u16], flags: ByteOrderFlags) -> Result<Vec<$ty>, CodecError> {
                decode_values::<$ty>(words, flags)
            }

            #[doc = concat!("Encode `", stringify!($ty), "` values into a register block")]
            pub fn $encode(values: &[$ty], flags: ByteOrderFlags) -> Vec<u16> {
                encode_values(values, flags)
            }
        )*
    };
}

array_helpers! {
    words_to_i16s, i16s_to_words => i16;
    words_to_u16s, u16s_to_words => u16;
    words_to_i32s, i32s_to_words => i32;
    words_to_u32s, u32s_to_words => u32;
    words_to_f32s, f32s_to_words => f32;
    words_to_i64s, i64s_to_words => i64;
    words_to_u64s, u64s_to_words => u64;
    words_to_f64s, f64s_to_words => f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same(a: &TypedValue, b: &TypedValue) -> bool {
        match (a, b) {
            (TypedValue::Float32(x), TypedValue::Float32(y)) => x.to_bits() == y.to_bits(),
            (TypedValue::Float64(x), TypedValue::Float64(y)) => x.to_bits() == y.to_bits(),
            _ => a == b,
        }
    }

    #[test]
    fn test_word_order_table() {
        let cases = [
            (ByteOrderFlags::new(false, false), [0x5678, 0x1234]),
            (ByteOrderFlags::new(false, true), [0x1234, 0x5678]),
            (ByteOrderFlags::new(true, false), [0x7856, 0x3412]),
            (ByteOrderFlags::new(true, true), [0x3412, 0x7856]),
        ];
        for (flags, words) in cases {
            assert_eq!(0x12345678u32.to_words(flags), words.to_vec(), "{}", flags);
            assert_eq!(u32::from_words(&words, flags), 0x12345678, "{}", flags);
        }
    }

    #[test]
    fn test_single_register_byte_swap() {
        let plain = ByteOrderFlags::default();
        let swapped = ByteOrderFlags::new(true, false);
        assert_eq!(decode(&[0x1234], ValueType::UInt16, 1, plain).unwrap(), TypedValue::UInt16(0x1234));
        assert_eq!(decode(&[0x1234], ValueType::UInt16, 1, swapped).unwrap(), TypedValue::UInt16(0x3412));
        assert_eq!(decode(&[0xFFFE], ValueType::Int16, 1, plain).unwrap(), TypedValue::Int16(-2));
        // word swap has nothing to reorder in one register
        assert_eq!(
            decode(&[0x00FF], ValueType::Int16, 1, ByteOrderFlags::new(false, true)).unwrap(),
            TypedValue::Int16(0x00FF)
        );
    }

    #[test]
    fn test_sixty_four_bit_order() {
        let value = 0x0102_0304_0506_0708u64;
        let flags = ByteOrderFlags::new(false, true);
        assert_eq!(value.to_words(flags), vec![0x0102, 0x0304, 0x0506, 0x0708]);
        assert_eq!(value.to_words(ByteOrderFlags::default()), vec![0x0708, 0x0506, 0x0304, 0x0102]);
    }

    #[test]
    fn test_bits16_ignores_flags() {
        let word = 0b1000_0000_0000_0101u16;
        for flags in ByteOrderFlags::ALL {
            let value = decode(&[word], ValueType::Bits16, 1, flags).unwrap();
            match &value {
                TypedValue::Bits(bits) => {
                    assert_eq!(bits.len(), 16);
                    assert!(bits[0] && !bits[1] && bits[2] && bits[15]);
                },
                other => panic!("unexpected {:?}", other),
            }
            assert_eq!(encode(&value, ValueType::Bits16, flags).unwrap(), vec![word]);
        }
    }

    #[test]
    fn test_numeric_round_trip_extremes() {
        let values = vec![
            TypedValue::Int16(0), TypedValue::Int16(i16::MIN), TypedValue::Int16(i16::MAX),
            TypedValue::UInt16(0), TypedValue::UInt16(u16::MAX),
            TypedValue::Int32(0), TypedValue::Int32(i32::MIN), TypedValue::Int32(i32::MAX),
            TypedValue::UInt32(0), TypedValue::UInt32(u32::MAX),
            TypedValue::Int64(0), TypedValue::Int64(i64::MIN), TypedValue::Int64(i64::MAX),
            TypedValue::UInt64(0), TypedValue::UInt64(u64::MAX),
            TypedValue::Float32(0.0), TypedValue::Float32(f32::MIN), TypedValue::Float32(f32::MAX),
            TypedValue::Float32(f32::NAN), TypedValue::Float32(f32::INFINITY), TypedValue::Float32(f32::NEG_INFINITY),
            TypedValue::Float64(0.0), TypedValue::Float64(f64::MIN), TypedValue::Float64(f64::MAX),
            TypedValue::Float64(f64::NAN), TypedValue::Float64(f64::INFINITY), TypedValue::Float64(f64::NEG_INFINITY),
        ];

        for flags in ByteOrderFlags::ALL {
            for value in &values {
                let value_type = value.value_type();
                let words = encode(value, value_type, flags).unwrap();
                assert_eq!(words.len(), value_type.registers_per_element() as usize);
                let back = decode(&words, value_type, 1, flags).unwrap();
                assert!(same(value, &back), "{:?} -> {:?} under {}", value, back, flags);
            }
        }
    }

    #[test]
    fn test_raw_words_round_trip() {
        let words = [0xDEAD, 0xBEEF, 0x0001, 0x8000];
        for flags in ByteOrderFlags::ALL {
            for value_type in ValueType::ALL {
                let (span, registers) = if value_type.is_packed() {
                    (8, 4)
                } else {
                    (1, value_type.registers_per_element() as usize)
                };
                let block = &words[..registers];
                let value = decode(block, value_type, span, flags).unwrap();
                let again = encode(&value, value_type, flags).unwrap();
                assert_eq!(again, block.to_vec(), "{} under {}", value_type, flags);
            }
        }
    }

    #[test]
    fn test_ascii_odd_length_round_trip() {
        for flags in ByteOrderFlags::ALL {
            let text = TypedValue::Ascii("PUMP-7".to_string() + "A");
            let words = encode(&text, ValueType::AsciiString, flags).unwrap();
            assert_eq!(words.len(), 4);
            assert_eq!(decode(&words, ValueType::AsciiString, 7, flags).unwrap(), text);
        }
    }

    #[test]
    fn test_ascii_byte_order() {
        // 'A' = 0x41, 'B' = 0x42
        let plain = decode(&[0x4241], ValueType::AsciiString, 2, ByteOrderFlags::default()).unwrap();
        assert_eq!(plain, TypedValue::Ascii("AB".to_string()));
        let swapped = decode(&[0x4142], ValueType::AsciiString, 2, ByteOrderFlags::new(true, true)).unwrap();
        assert_eq!(swapped, TypedValue::Ascii("AB".to_string()));
    }

    #[test]
    fn test_ascii_trailing_nul_and_padding() {
        let flags = ByteOrderFlags::new(true, false);
        let block = [0x4F4B, 0x0000];
        let value = decode(&block, ValueType::AsciiString, 4, flags).unwrap();
        assert_eq!(value, TypedValue::Ascii("OK".to_string()));
        assert_eq!(encode(&value, ValueType::AsciiString, flags).unwrap(), vec![0x4F4B]);
        assert_eq!(encode_padded(&value, ValueType::AsciiString, 2, flags).unwrap(), block.to_vec());
        assert!(encode_padded(&value, ValueType::AsciiString, 0, flags).is_err());
    }

    #[test]
    fn test_ascii_rejects_wide_characters() {
        let err = encode(&TypedValue::Ascii("30°C €".to_string()), ValueType::AsciiString, ByteOrderFlags::default()).unwrap_err();
        assert_eq!(err, CodecError::InvalidCharacter { ch: '€' });
    }

    #[test]
    fn test_hex_round_trip_is_uppercase() {
        let flags = ByteOrderFlags::new(true, false);
        let words = encode(&TypedValue::Hex("0a1bFF".to_string()), ValueType::HexString, flags).unwrap();
        assert_eq!(words, vec![0x0A1B, 0xFF00]);
        let back = decode(&words, ValueType::HexString, 3, flags).unwrap();
        assert_eq!(back, TypedValue::Hex("0A1BFF".to_string()));

        let err = encode(&TypedValue::Hex("ABC".to_string()), ValueType::HexString, flags).unwrap_err();
        assert!(matches!(err, CodecError::InvalidHex { .. }));
    }

    #[test]
    fn test_bytes_ignore_word_swap() {
        let bytes = TypedValue::Bytes(vec![1, 2, 3, 4, 5]);
        let plain = encode(&bytes, ValueType::Byte, ByteOrderFlags::new(true, false)).unwrap();
        let word_swapped = encode(&bytes, ValueType::Byte, ByteOrderFlags::new(true, true)).unwrap();
        assert_eq!(plain, vec![0x0102, 0x0304, 0x0500]);
        assert_eq!(plain, word_swapped);
        assert_eq!(decode(&plain, ValueType::Byte, 5, ByteOrderFlags::new(true, true)).unwrap(), bytes);
    }

    #[test]
    fn test_array_decode() {
        let flags = ByteOrderFlags::default();
        let values = decode_array(&[0x0001, 0x0000, 0x0002, 0x0000], ValueType::Int32, flags).unwrap();
        assert_eq!(values, vec![TypedValue::Int32(1), TypedValue::Int32(2)]);

        let err = decode_array(&[0x0001, 0x0000, 0x0002], ValueType::Int32, flags).unwrap_err();
        assert_eq!(err, CodecError::WrongRegisterCount { value_type: ValueType::Int32, expected: 4, actual: 3 });

        let floats = vec![1.5f32, -2.75, 1e-3];
        let words = encode_values(&floats, flags);
        assert_eq!(decode_values::<f32>(&words, flags).unwrap(), floats);

        let swapped = ByteOrderFlags::new(false, true);
        assert_eq!(i32s_to_words(&[1, -1], swapped), vec![0x0000, 0x0001, 0xFFFF, 0xFFFF]);
        assert_eq!(words_to_u64s(&[0, 0, 0, 7], swapped).unwrap(), vec![7]);
        assert!(words_to_f64s(&[0, 0, 0], swapped).is_err());
    }

    #[test]
    fn test_codec_errors() {
        let flags = ByteOrderFlags::default();
        let err = decode(&[1, 2, 3], ValueType::Float64, 1, flags).unwrap_err();
        assert!(matches!(err, CodecError::WrongRegisterCount { expected: 4, actual: 3, .. }));

        let err = encode(&TypedValue::Int16(5), ValueType::Int32, flags).unwrap_err();
        assert_eq!(err, CodecError::TypeMismatch { expected: ValueType::Int32, actual: ValueType::Int16 });

        let err = encode(&TypedValue::Bits(vec![true; 8]), ValueType::Bits16, flags).unwrap_err();
        assert_eq!(err, CodecError::InvalidBitCount { count: 8 });
    }

    #[test]
    fn test_value_type_tags() {
        for value_type in ValueType::ALL {
            assert_eq!(value_type.as_str().parse::<ValueType>().unwrap(), value_type);
        }
        assert_eq!("Float64".parse::<ValueType>().unwrap(), ValueType::Float64);
        assert!("quad".parse::<ValueType>().is_err());
        assert_eq!(serde_json::to_string(&ValueType::UInt32).unwrap(), "\"uint\"");
    }

    #[test]
    fn test_register_spans() {
        assert_eq!(ValueType::Int32.registers_for(63), 126);
        assert_eq!(ValueType::Float64.registers_for(31), 124);
        assert_eq!(ValueType::AsciiString.registers_for(7), 4);
        assert_eq!(ValueType::Byte.registers_for(250), 125);
        assert_eq!(ValueType::Bits16.registers_for(1), 1);
    }

    #[test]
    fn test_display_and_json() {
        let bits = decode(&[0x0003], ValueType::Bits16, 1, ByteOrderFlags::default()).unwrap();
        assert_eq!(bits.to_string(), "0000000000000011");
        assert_eq!(TypedValue::Bytes(vec![0x0A, 0xFF]).to_string(), "0A FF");
        assert_eq!(TypedValue::Int32(-7).to_json(), serde_json::json!(-7));
        assert_eq!(TypedValue::Ascii("hi".into()).to_json(), serde_json::json!("hi"));
    }
}
