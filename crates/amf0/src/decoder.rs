//! AMF0 decoder.

use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::Bytes;
use num_traits::FromPrimitive;
use rill_bytes_util::BytesCursorExt;

use crate::{Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// AMF0 decoder over a [`Bytes`] buffer.
///
/// Provides functions to decode each AMF0 type plus a generic
/// [`decode_value`](Amf0Decoder::decode_value) entry point.
#[derive(Debug, Clone)]
pub struct Amf0Decoder {
    reader: io::Cursor<Bytes>,
    next_marker: Option<Amf0Marker>,
}

impl Amf0Decoder {
    /// Create a new decoder from a buffer.
    pub fn new(buf: Bytes) -> Self {
        Self {
            reader: io::Cursor::new(buf),
            next_marker: None,
        }
    }

    /// Decode a single [`Amf0Value`] from the buffer.
    pub fn decode_value(&mut self) -> Result<Amf0Value, Amf0Error> {
        let marker = self.peek_marker()?;

        match marker {
            Amf0Marker::Boolean => self.decode_boolean().map(Amf0Value::Boolean),
            Amf0Marker::Number | Amf0Marker::Date => self.decode_number().map(Amf0Value::Number),
            Amf0Marker::String | Amf0Marker::LongString | Amf0Marker::XmlDocument => {
                self.decode_string().map(Amf0Value::String)
            }
            Amf0Marker::Null | Amf0Marker::Undefined => self.decode_null().map(|_| Amf0Value::Null),
            Amf0Marker::Object | Amf0Marker::TypedObject | Amf0Marker::EcmaArray => {
                self.decode_object().map(Amf0Value::Object)
            }
            Amf0Marker::StrictArray => self.decode_strict_array().map(Amf0Value::StrictArray),
            _ => Err(Amf0Error::UnsupportedMarker(marker)),
        }
    }

    /// Decode all values remaining in the buffer.
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>, Amf0Error> {
        let mut values = Vec::new();

        while self.has_remaining()? {
            values.push(self.decode_value()?);
        }

        Ok(values)
    }

    /// Check whether any values are left in the buffer.
    pub fn has_remaining(&mut self) -> Result<bool, Amf0Error> {
        match self.peek_marker() {
            Ok(_) => Ok(true),
            Err(Amf0Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Peek the next marker without consuming it.
    pub fn peek_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.read_marker()?;
        // Buffer the marker for the next read
        self.next_marker = Some(marker);

        Ok(marker)
    }

    fn read_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        if let Some(marker) = self.next_marker.take() {
            return Ok(marker);
        }

        let marker = self.reader.read_u8()?;
        Amf0Marker::from_u8(marker).ok_or(Amf0Error::UnknownMarker(marker))
    }

    fn expect_marker(&mut self, expect: &'static [Amf0Marker]) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.read_marker()?;

        if !expect.contains(&marker) {
            Err(Amf0Error::UnexpectedType {
                expected: expect,
                got: marker,
            })
        } else {
            Ok(marker)
        }
    }

    /// Decode a number.
    pub fn decode_number(&mut self) -> Result<f64, Amf0Error> {
        let marker = self.expect_marker(&[Amf0Marker::Number, Amf0Marker::Date])?;

        let number = self.reader.read_f64::<BigEndian>()?;

        if marker == Amf0Marker::Date {
            // Skip the timezone
            self.reader.read_i16::<BigEndian>()?;
        }

        Ok(number)
    }

    /// Decode a boolean.
    pub fn decode_boolean(&mut self) -> Result<bool, Amf0Error> {
        self.expect_marker(&[Amf0Marker::Boolean])?;
        let value = self.reader.read_u8()?;
        Ok(value != 0)
    }

    // Object keys are not preceded by a marker and are always normal strings.
    fn decode_normal_string(&mut self) -> Result<String, Amf0Error> {
        let len = self.reader.read_u16::<BigEndian>()? as usize;
        let bytes = self.reader.extract_bytes(len)?;

        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Decode a string.
    ///
    /// This function can decode both normal strings and long strings.
    pub fn decode_string(&mut self) -> Result<String, Amf0Error> {
        let marker = self.expect_marker(&[Amf0Marker::String, Amf0Marker::LongString, Amf0Marker::XmlDocument])?;

        let len = if marker == Amf0Marker::String {
            self.reader.read_u16::<BigEndian>()? as usize
        } else {
            // LongString or XmlDocument
            self.reader.read_u32::<BigEndian>()? as usize
        };

        let bytes = self.reader.extract_bytes(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Decode a null value.
    ///
    /// This function also accepts undefined values.
    pub fn decode_null(&mut self) -> Result<(), Amf0Error> {
        self.expect_marker(&[Amf0Marker::Null, Amf0Marker::Undefined])?;
        Ok(())
    }

    fn decode_object_key(&mut self) -> Result<Option<String>, Amf0Error> {
        let key = self.decode_normal_string()?;

        // The object end marker is preceded by an empty string
        if key.is_empty() && self.peek_marker()? == Amf0Marker::ObjectEnd {
            // Clear the buffered marker
            self.next_marker = None;

            return Ok(None);
        }

        Ok(Some(key))
    }

    /// Decode an object.
    ///
    /// This function can decode anonymous objects, typed objects and ECMA
    /// arrays; typed object class names are discarded.
    pub fn decode_object(&mut self) -> Result<Amf0Object, Amf0Error> {
        let marker = self.expect_marker(&[Amf0Marker::Object, Amf0Marker::TypedObject, Amf0Marker::EcmaArray])?;

        match marker {
            Amf0Marker::Object | Amf0Marker::TypedObject => {
                if marker == Amf0Marker::TypedObject {
                    self.decode_normal_string()?;
                }

                let mut object = Amf0Object::new();

                while let Some(key) = self.decode_object_key()? {
                    let value = self.decode_value()?;
                    object.push((key, value));
                }

                Ok(object)
            }
            _ => {
                // EcmaArray
                let size = self.reader.read_u32::<BigEndian>()?;
                let mut object = Amf0Object::with_capacity(size as usize);

                for _ in 0..size {
                    let key = self.decode_normal_string()?;
                    let value = self.decode_value()?;
                    object.push((key, value));
                }

                // Some encoders terminate ECMA arrays with an object end
                // marker after the last declared key.
                if self.has_remaining()? && self.peek_marker()? == Amf0Marker::ObjectEnd {
                    self.next_marker = None;
                }

                Ok(object)
            }
        }
    }

    /// Decode a strict array.
    pub fn decode_strict_array(&mut self) -> Result<Vec<Amf0Value>, Amf0Error> {
        self.expect_marker(&[Amf0Marker::StrictArray])?;
        let size = self.reader.read_u32::<BigEndian>()?;

        let mut array = Vec::with_capacity(size as usize);

        for _ in 0..size {
            array.push(self.decode_value()?);
        }

        Ok(array)
    }
}
