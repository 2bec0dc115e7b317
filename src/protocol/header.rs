//! XML header frame (id 3)
//!
//! The header is an ISMRMRD XML document describing the acquisition. Only the
//! parts needed to size the reconstruction are modelled here; everything else
//! is ignored on parse and preserved verbatim because the original bytes are
//! passed through to the output stream.

use crate::error::{MrdError, Result};
use serde::Deserialize;

/// Root `<ismrmrdHeader>` element
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsmrmrdHeader {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub acquisition_system_information: Option<AcquisitionSystemInformation>,
    #[serde(default)]
    pub encoding: Vec<Encoding>,
}

/// `<acquisitionSystemInformation>`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquisitionSystemInformation {
    #[serde(default)]
    pub receiver_channels: Option<u16>,
}

/// One `<encoding>` block
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    #[serde(default)]
    pub encoded_space: Option<EncodingSpace>,
    #[serde(default)]
    pub recon_space: Option<EncodingSpace>,
    #[serde(default)]
    pub encoding_limits: Option<EncodingLimits>,
    #[serde(default)]
    pub trajectory: Option<String>,
}

/// `<encodedSpace>` / `<reconSpace>`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EncodingSpace {
    #[serde(default, rename = "matrixSize")]
    pub matrix_size: Option<MatrixSize>,
    #[serde(default, rename = "fieldOfView_mm")]
    pub field_of_view_mm: Option<FieldOfView>,
}

/// `<matrixSize>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MatrixSize {
    pub x: u32,
    pub y: u32,
    #[serde(default = "default_matrix_z")]
    pub z: u32,
}

fn default_matrix_z() -> u32 {
    1
}

/// `<fieldOfView_mm>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct FieldOfView {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// `<encodingLimits>`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EncodingLimits {
    #[serde(default)]
    pub kspace_encoding_step_1: Option<Limit>,
    #[serde(default)]
    pub slice: Option<Limit>,
    #[serde(default)]
    pub contrast: Option<Limit>,
}

/// Minimum / maximum / center triple of one encoding counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Limit {
    #[serde(default)]
    pub minimum: u32,
    #[serde(default)]
    pub maximum: u32,
    #[serde(default)]
    pub center: u32,
}

/// Header frame contents: the raw XML plus the parsed view of it
#[derive(Debug, Clone, PartialEq)]
pub struct MrdHeader {
    raw: Vec<u8>,
    parsed: IsmrmrdHeader,
}

impl MrdHeader {
    /// Parse an XML header payload
    ///
    /// Trailing NUL bytes written by C-string based producers are ignored.
    pub fn parse(raw: Vec<u8>) -> Result<Self> {
        let end = raw
            .iter()
            .rposition(|&b| b != 0)
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let text = std::str::from_utf8(&raw[..end])
            .map_err(|e| MrdError::InvalidHeader(format!("Header is not valid UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            return Err(MrdError::InvalidHeader("Header document is empty".to_string()));
        }
        let parsed: IsmrmrdHeader = quick_xml::de::from_str(text)
            .map_err(|e| MrdError::InvalidHeader(e.to_string()))?;
        Ok(MrdHeader { raw, parsed })
    }

    /// Original XML bytes as received
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Parsed header
    pub fn header(&self) -> &IsmrmrdHeader {
        &self.parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER_XML: &str = r#"<?xml version="1.0"?>
<ismrmrdHeader xmlns="http://www.ismrm.org/ISMRMRD" xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <version>1</version>
  <studyInformation><studyTime>16:44:07</studyTime></studyInformation>
  <acquisitionSystemInformation>
    <systemVendor>SIEMENS</systemVendor>
    <receiverChannels>8</receiverChannels>
  </acquisitionSystemInformation>
  <encoding>
    <encodedSpace>
      <matrixSize><x>256</x><y>128</y><z>1</z></matrixSize>
      <fieldOfView_mm><x>600</x><y>300</y><z>6</z></fieldOfView_mm>
    </encodedSpace>
    <reconSpace>
      <matrixSize><x>128</x><y>128</y><z>1</z></matrixSize>
      <fieldOfView_mm><x>300</x><y>300</y><z>6</z></fieldOfView_mm>
    </reconSpace>
    <encodingLimits>
      <kspace_encoding_step_1><minimum>0</minimum><maximum>127</maximum><center>64</center></kspace_encoding_step_1>
      <slice><minimum>0</minimum><maximum>2</maximum><center>0</center></slice>
      <repetition><minimum>0</minimum><maximum>9</maximum><center>0</center></repetition>
    </encodingLimits>
    <trajectory>cartesian</trajectory>
  </encoding>
</ismrmrdHeader>
"#;

    #[test]
    fn test_parse_full_header() {
        let header = MrdHeader::parse(HEADER_XML.as_bytes().to_vec()).unwrap();
        let hdr = header.header();

        assert_eq!(hdr.version.as_deref(), Some("1"));
        assert_eq!(
            hdr.acquisition_system_information
                .as_ref()
                .and_then(|a| a.receiver_channels),
            Some(8)
        );
        assert_eq!(hdr.encoding.len(), 1);

        let enc = &hdr.encoding[0];
        let encoded = enc.encoded_space.as_ref().unwrap().matrix_size.unwrap();
        assert_eq!((encoded.x, encoded.y, encoded.z), (256, 128, 1));
        let fov = enc.recon_space.as_ref().unwrap().field_of_view_mm.unwrap();
        assert_eq!(fov.x, 300.0);

        let limits = enc.encoding_limits.as_ref().unwrap();
        assert_eq!(limits.kspace_encoding_step_1.unwrap().center, 64);
        assert_eq!(limits.slice.unwrap().maximum, 2);
        assert!(limits.contrast.is_none());
        assert_eq!(enc.trajectory.as_deref(), Some("cartesian"));
    }

    #[test]
    fn test_raw_bytes_preserved() {
        let mut raw = HEADER_XML.as_bytes().to_vec();
        raw.push(0);
        let header = MrdHeader::parse(raw.clone()).unwrap();
        assert_eq!(header.raw(), raw.as_slice());
    }

    #[test]
    fn test_parse_minimal_header() {
        let xml = "<ismrmrdHeader><encoding><encodedSpace><matrixSize><x>4</x><y>4</y></matrixSize></encodedSpace></encoding></ismrmrdHeader>";
        let header = MrdHeader::parse(xml.as_bytes().to_vec()).unwrap();
        let enc = &header.header().encoding[0];
        assert_eq!(enc.encoded_space.as_ref().unwrap().matrix_size.unwrap().z, 1);
        assert!(enc.recon_space.is_none());
        assert!(header.header().acquisition_system_information.is_none());
    }

    #[test]
    fn test_parse_empty_header() {
        let result = MrdHeader::parse(vec![0, 0]);
        assert!(matches!(result, Err(MrdError::InvalidHeader(_))));
    }

    #[test]
    fn test_parse_invalid_utf8() {
        let result = MrdHeader::parse(vec![0xFF, 0xFE, 0xFD]);
        assert!(matches!(result, Err(MrdError::InvalidHeader(_))));
    }

    #[test]
    fn test_parse_malformed_xml() {
        let result = MrdHeader::parse(b"<ismrmrdHeader><encoding>".to_vec());
        assert!(result.is_err());
    }
}
