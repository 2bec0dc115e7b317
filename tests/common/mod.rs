//! Shared builders for reconstruction integration tests

#![allow(dead_code)]

use mrd_stream_recon::io::{FrameReader, FrameWriter};
use mrd_stream_recon::protocol::{Acquisition, AcquisitionHeader, Image, ReadOutcome};
use ndarray::Array2;
use num_complex::Complex32;

/// Encoding parameters of a synthetic acquisition
#[derive(Debug, Clone, Copy)]
pub struct Protocol {
    pub encoded: [u32; 3],
    pub recon: [u32; 3],
    pub coils: u16,
    pub slices: u16,
    pub contrasts: u16,
}

impl Protocol {
    pub fn cartesian_2d(nx: u32, ny: u32) -> Self {
        Protocol {
            encoded: [nx, ny, 1],
            recon: [nx, ny, 1],
            coils: 1,
            slices: 1,
            contrasts: 1,
        }
    }

    /// XML header declaring this protocol
    ///
    /// Encoding limits are only written for slice/contrast counts above one.
    pub fn header_xml(&self) -> String {
        let mut limits = String::new();
        if self.slices > 1 {
            limits.push_str(&format!(
                "<slice><minimum>0</minimum><maximum>{}</maximum><center>0</center></slice>",
                self.slices - 1
            ));
        }
        if self.contrasts > 1 {
            limits.push_str(&format!(
                "<contrast><minimum>0</minimum><maximum>{}</maximum><center>0</center></contrast>",
                self.contrasts - 1
            ));
        }
        let limits = if limits.is_empty() {
            String::new()
        } else {
            format!("<encodingLimits>{}</encodingLimits>", limits)
        };

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ismrmrdHeader xmlns="http://www.ismrm.org/ISMRMRD">
  <version>2</version>
  <acquisitionSystemInformation>
    <receiverChannels>{coils}</receiverChannels>
  </acquisitionSystemInformation>
  <encoding>
    <encodedSpace>
      <matrixSize><x>{ex}</x><y>{ey}</y><z>{ez}</z></matrixSize>
      <fieldOfView_mm><x>512</x><y>256</y><z>5</z></fieldOfView_mm>
    </encodedSpace>
    <reconSpace>
      <matrixSize><x>{rx}</x><y>{ry}</y><z>{rz}</z></matrixSize>
      <fieldOfView_mm><x>256</x><y>256</y><z>5</z></fieldOfView_mm>
    </reconSpace>
    {limits}
    <trajectory>cartesian</trajectory>
  </encoding>
</ismrmrdHeader>"#,
            coils = self.coils,
            ex = self.encoded[0],
            ey = self.encoded[1],
            ez = self.encoded[2],
            rx = self.recon[0],
            ry = self.recon[1],
            rz = self.recon[2],
            limits = limits,
        )
    }

    /// Fully sampled repetition, every sample set to `value`
    ///
    /// Lines are ordered contrast, slice, kz, ky from slowest to fastest.
    pub fn repetition(&self, repetition: u16, samples: usize, value: f32) -> Vec<Acquisition> {
        let mut acquisitions = Vec::new();
        for contrast in 0..self.contrasts {
            for slice in 0..self.slices {
                for kz in 0..self.encoded[2] as u16 {
                    for ky in 0..self.encoded[1] as u16 {
                        acquisitions.push(acquisition(
                            self.coils as usize,
                            samples,
                            Counters {
                                ky,
                                kz,
                                slice,
                                contrast,
                                repetition,
                            },
                            value,
                        ));
                    }
                }
            }
        }
        acquisitions
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub ky: u16,
    pub kz: u16,
    pub slice: u16,
    pub contrast: u16,
    pub repetition: u16,
}

pub fn acquisition(coils: usize, samples: usize, counters: Counters, value: f32) -> Acquisition {
    let mut head = AcquisitionHeader::default();
    head.measurement_uid = 4711;
    head.idx.kspace_encode_step_1 = counters.ky;
    head.idx.kspace_encode_step_2 = counters.kz;
    head.idx.slice = counters.slice;
    head.idx.contrast = counters.contrast;
    head.idx.repetition = counters.repetition;
    head.read_dir = [1.0, 0.0, 0.0];
    head.phase_dir = [0.0, 1.0, 0.0];
    head.slice_dir = [0.0, 0.0, 1.0];
    let data = Array2::from_elem((coils, samples), Complex32::new(value, 0.0));
    Acquisition::new(head, data).expect("valid acquisition")
}

/// Encode a complete input stream
pub fn input_stream(xml: &str, acquisitions: &[Acquisition], close: bool) -> Vec<u8> {
    let mut writer = FrameWriter::new(Vec::new());
    writer.write_header(xml.as_bytes()).unwrap();
    for acq in acquisitions {
        writer.write_acquisition(acq).unwrap();
    }
    if close {
        writer.write_close().unwrap();
    }
    writer.into_inner()
}

/// Decoded reconstructor output
#[derive(Debug)]
pub struct Output {
    pub header: Option<Vec<u8>>,
    pub images: Vec<Image>,
    pub closed: bool,
}

/// Decode reconstructor output: optional header, images, Close
pub fn decode_output(bytes: &[u8]) -> Output {
    let mut reader = FrameReader::new(bytes);
    let mut output = Output {
        header: None,
        images: Vec::new(),
        closed: false,
    };

    match reader.read_header().unwrap() {
        ReadOutcome::Message(header) => {
            output.header = Some(header.raw().to_vec());
            read_images(&mut reader, &mut output);
        }
        ReadOutcome::Closed => {
            output.closed = true;
            assert!(reader.next_message_id().unwrap().is_none(), "frames after Close");
        }
        ReadOutcome::EndOfStream => {}
    }
    output
}

fn read_images(reader: &mut FrameReader<&[u8]>, output: &mut Output) {
    loop {
        match reader.read_image().unwrap() {
            ReadOutcome::Message(image) => output.images.push(image),
            ReadOutcome::Closed => {
                output.closed = true;
                assert!(
                    reader.next_message_id().unwrap().is_none(),
                    "frames after Close"
                );
                return;
            }
            ReadOutcome::EndOfStream => return,
        }
    }
}

/// Index of the largest pixel and its value
pub fn peak(pixels: &[f32]) -> (usize, f32) {
    pixels
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::MIN), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() <= 1e-3 * expected.abs().max(1.0),
        "{} != {}",
        actual,
        expected
    );
}
