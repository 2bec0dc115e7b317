//! Encoding metadata resolved once from the XML header

use crate::error::{MrdError, Result};
use crate::protocol::header::{IsmrmrdHeader, MatrixSize};
use tracing::{info, warn};

/// Matrix extent along x (readout), y (phase) and z (partition)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matrix {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl From<MatrixSize> for Matrix {
    fn from(size: MatrixSize) -> Self {
        Matrix {
            x: size.x as usize,
            y: size.y as usize,
            z: size.z as usize,
        }
    }
}

/// Fixed reconstruction parameters for one stream
///
/// Produced by [`EncodingMetadata::resolve`] before the first acquisition is
/// read and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingMetadata {
    /// Encoded k-space matrix (eNx, eNy, eNz)
    pub encoded: Matrix,
    /// Output image matrix (rNx, rNy, rNz)
    pub recon: Matrix,
    /// Output field of view in mm
    pub recon_fov: [f32; 3],
    pub coils: usize,
    pub slices: usize,
    pub contrasts: usize,
    /// Shift applied to ky so the k-space center lands at ⌊(eNy+1)/2⌋
    pub ky_offset: i64,
}

impl EncodingMetadata {
    /// Resolve metadata from the first encoding of a parsed header
    ///
    /// # Errors
    ///
    /// - [`MrdError::MissingEncodingInfo`] - no encoding, or no encoded/recon
    ///   matrix size
    ///
    /// # Examples
    ///
    /// ```
    /// use mrd_stream_recon::protocol::MrdHeader;
    /// use mrd_stream_recon::recon::EncodingMetadata;
    ///
    /// let xml = "<ismrmrdHeader><encoding>\
    ///     <encodedSpace><matrixSize><x>128</x><y>64</y><z>1</z></matrixSize></encodedSpace>\
    ///     <reconSpace><matrixSize><x>64</x><y>64</y><z>1</z></matrixSize></reconSpace>\
    ///     </encoding></ismrmrdHeader>";
    /// let header = MrdHeader::parse(xml.as_bytes().to_vec())?;
    /// let meta = EncodingMetadata::resolve(header.header())?;
    /// assert_eq!(meta.encoded.x, 128);
    /// assert_eq!(meta.coils, 1);
    /// # Ok::<(), mrd_stream_recon::MrdError>(())
    /// ```
    pub fn resolve(header: &IsmrmrdHeader) -> Result<Self> {
        match header.version.as_deref() {
            Some(version) => info!(version = version, "XML header version"),
            None => info!("XML header unspecified version"),
        }

        let enc = header.encoding.first().ok_or_else(|| {
            MrdError::MissingEncodingInfo("header has no encoding section".to_string())
        })?;
        if header.encoding.len() > 1 {
            warn!(
                encodings = header.encoding.len(),
                "Multiple encoding spaces in header, using the first"
            );
        }

        let encoded = enc
            .encoded_space
            .as_ref()
            .and_then(|space| space.matrix_size)
            .ok_or_else(|| MrdError::MissingEncodingInfo("encodedSpace/matrixSize".to_string()))?;
        let recon_space = enc
            .recon_space
            .as_ref()
            .ok_or_else(|| MrdError::MissingEncodingInfo("reconSpace".to_string()))?;
        let recon = recon_space
            .matrix_size
            .ok_or_else(|| MrdError::MissingEncodingInfo("reconSpace/matrixSize".to_string()))?;
        let recon_fov = recon_space
            .field_of_view_mm
            .map(|fov| [fov.x, fov.y, fov.z])
            .unwrap_or([0.0; 3]);

        let coils = header
            .acquisition_system_information
            .as_ref()
            .and_then(|info| info.receiver_channels)
            .map(usize::from)
            .unwrap_or(1);

        let limits = enc.encoding_limits.as_ref();
        let slices = limits
            .and_then(|l| l.slice)
            .map(|l| l.maximum as usize + 1)
            .unwrap_or(1);
        let contrasts = limits
            .and_then(|l| l.contrast)
            .map(|l| l.maximum as usize + 1)
            .unwrap_or(1);
        let ky_offset = limits
            .and_then(|l| l.kspace_encoding_step_1)
            .map(|l| (encoded.y as i64 + 1) / 2 - l.center as i64)
            .unwrap_or(0);

        let trajectory = enc.trajectory.as_deref().unwrap_or("cartesian");
        if trajectory != "cartesian" {
            warn!(
                trajectory = trajectory,
                "Non-Cartesian trajectory, samples are placed on the Cartesian grid"
            );
        }

        let metadata = EncodingMetadata {
            encoded: encoded.into(),
            recon: recon.into(),
            recon_fov,
            coils,
            slices,
            contrasts,
            ky_offset,
        };

        info!(
            encoded = ?(metadata.encoded.x, metadata.encoded.y, metadata.encoded.z),
            recon = ?(metadata.recon.x, metadata.recon.y, metadata.recon.z),
            coils = metadata.coils,
            slices = metadata.slices,
            contrasts = metadata.contrasts,
            ky_offset = metadata.ky_offset,
            trajectory = trajectory,
            "Resolved encoding metadata"
        );

        Ok(metadata)
    }

    /// Readout length for a repetition whose first acquisition has `samples`
    ///
    /// Falls back to rNx when the readout oversampling was already removed
    /// upstream.
    pub fn readout_length(&self, samples: usize) -> usize {
        if samples == self.encoded.x {
            self.encoded.x
        } else {
            self.recon.x
        }
    }

    /// K-space volume shape `[contrasts, slices, coils, eNz, eNy, readout]`
    pub fn kspace_shape(&self, readout_length: usize) -> [usize; 6] {
        [
            self.contrasts,
            self.slices,
            self.coils,
            self.encoded.z,
            self.encoded.y,
            readout_length,
        ]
    }

    /// Number of images produced per repetition
    pub fn images_per_repetition(&self) -> usize {
        self.contrasts * self.slices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::header::MrdHeader;

    fn parse(xml: &str) -> IsmrmrdHeader {
        MrdHeader::parse(xml.as_bytes().to_vec())
            .unwrap()
            .header()
            .clone()
    }

    const SPACES: &str = "<encodedSpace><matrixSize><x>128</x><y>64</y><z>1</z></matrixSize></encodedSpace>\
        <reconSpace><matrixSize><x>64</x><y>64</y><z>1</z></matrixSize>\
        <fieldOfView_mm><x>250</x><y>250</y><z>5</z></fieldOfView_mm></reconSpace>";

    #[test]
    fn test_defaults_without_limits() {
        let hdr = parse(&format!(
            "<ismrmrdHeader><encoding>{}</encoding></ismrmrdHeader>",
            SPACES
        ));
        let meta = EncodingMetadata::resolve(&hdr).unwrap();

        assert_eq!(meta.encoded, Matrix { x: 128, y: 64, z: 1 });
        assert_eq!(meta.recon, Matrix { x: 64, y: 64, z: 1 });
        assert_eq!(meta.recon_fov, [250.0, 250.0, 5.0]);
        assert_eq!(meta.coils, 1);
        assert_eq!(meta.slices, 1);
        assert_eq!(meta.contrasts, 1);
        assert_eq!(meta.ky_offset, 0);
    }

    #[test]
    fn test_limits_and_channels() {
        let hdr = parse(&format!(
            "<ismrmrdHeader>\
             <acquisitionSystemInformation><receiverChannels>4</receiverChannels></acquisitionSystemInformation>\
             <encoding>{}<encodingLimits>\
             <kspace_encoding_step_1><minimum>0</minimum><maximum>47</maximum><center>24</center></kspace_encoding_step_1>\
             <slice><minimum>0</minimum><maximum>2</maximum><center>0</center></slice>\
             <contrast><minimum>0</minimum><maximum>1</maximum><center>0</center></contrast>\
             </encodingLimits></encoding></ismrmrdHeader>",
            SPACES
        ));
        let meta = EncodingMetadata::resolve(&hdr).unwrap();

        assert_eq!(meta.coils, 4);
        assert_eq!(meta.slices, 3);
        assert_eq!(meta.contrasts, 2);
        // (64 + 1) / 2 - 24 = 8
        assert_eq!(meta.ky_offset, 8);
        assert_eq!(meta.images_per_repetition(), 6);
    }

    #[test]
    fn test_missing_recon_space() {
        let hdr = parse(
            "<ismrmrdHeader><encoding><encodedSpace><matrixSize><x>4</x><y>4</y><z>1</z></matrixSize></encodedSpace></encoding></ismrmrdHeader>",
        );
        let result = EncodingMetadata::resolve(&hdr);
        assert!(matches!(result, Err(MrdError::MissingEncodingInfo(_))));
    }

    #[test]
    fn test_missing_encoding() {
        let hdr = parse("<ismrmrdHeader><version>1</version></ismrmrdHeader>");
        let result = EncodingMetadata::resolve(&hdr);
        assert!(matches!(result, Err(MrdError::MissingEncodingInfo(_))));
    }

    #[test]
    fn test_readout_length_oversampling() {
        let hdr = parse(&format!(
            "<ismrmrdHeader><encoding>{}</encoding></ismrmrdHeader>",
            SPACES
        ));
        let meta = EncodingMetadata::resolve(&hdr).unwrap();

        assert_eq!(meta.readout_length(128), 128);
        assert_eq!(meta.readout_length(64), 64);
        assert_eq!(meta.kspace_shape(128), [1, 1, 1, 1, 64, 128]);
    }

    #[test]
    fn test_non_cartesian_trajectory_resolves() {
        let hdr = parse(&format!(
            "<ismrmrdHeader><encoding>{}<trajectory>radial</trajectory></encoding></ismrmrdHeader>",
            SPACES
        ));
        assert_eq!(hdr.encoding[0].trajectory.as_deref(), Some("radial"));
        let meta = EncodingMetadata::resolve(&hdr).unwrap();
        assert_eq!(meta.encoded, Matrix { x: 128, y: 64, z: 1 });
    }
}
