//! Binary model format
//!
//! Layout (all little-endian):
//!
//! ```text
//! layer_count: u32
//! loss_kind:   u8
//! per layer:
//!   input_dim u32, output_dim u32, activation u8, decay f64, bias_suppression u8,
//!   ownership u8 (0 owning, 1 shared) [+ owner_index u32, transposed u8 when shared]
//!   owning only: weights (output_dim * input_dim f64, row-major),
//!                biases (output_dim f64, absent when suppressed)
//! ```
//!
//! Shared copies carry no payload; they bind to their already-restored owner.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{NetworkError, Result};
use crate::layers::{LayerSpec, Sharing};
use crate::network::Network;
use crate::utils::{Activation, LossKind};

const OWNING: u8 = 0;
const SHARED: u8 = 1;

fn write_u32<W: Write>(writer: &mut W, value: usize) -> Result<()> {
    let value = u32::try_from(value).map_err(|_| {
        NetworkError::Format(format!("{} does not fit the u32 model format", value))
    })?;
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_u8<W: Write>(writer: &mut W, value: u8) -> Result<()> {
    writer.write_all(&[value])?;
    Ok(())
}

fn write_f64s<W: Write>(writer: &mut W, values: &[f64]) -> Result<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

fn read_u32<R: Read>(reader: &mut R) -> Result<usize> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes) as usize)
}

fn read_u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    Ok(byte[0])
}

fn read_bool<R: Read>(reader: &mut R) -> Result<bool> {
    match read_u8(reader)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(NetworkError::Format(format!(
            "invalid boolean byte: {}",
            other
        ))),
    }
}

fn read_f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(f64::from_le_bytes(bytes))
}

fn read_f64s<R: Read>(reader: &mut R, len: usize) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(len.min(1 << 16));
    for _ in 0..len {
        values.push(read_f64(reader)?);
    }
    Ok(values)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("model"));
    name.push(".tmp");
    path.with_file_name(name)
}

impl Network {
    /// Writes structure and owned parameters to `writer`.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_u32(writer, self.layers().len())?;
        write_u8(writer, self.loss_kind().code())?;

        for (i, layer) in self.layers().iter().enumerate() {
            write_u32(writer, layer.input_size())?;
            write_u32(writer, layer.output_size())?;
            write_u8(writer, layer.activation().code())?;
            writer.write_all(&layer.decay().to_le_bytes())?;
            write_u8(writer, u8::from(!layer.has_bias()))?;

            match layer.sharing() {
                Sharing::Owning => {
                    write_u8(writer, OWNING)?;
                    let params = self.parameters(i).ok_or_else(|| {
                        NetworkError::InvalidConfig(format!("layer {} has no parameters", i))
                    })?;
                    write_f64s(writer, params.weights())?;
                    write_f64s(writer, params.biases())?;
                }
                Sharing::Shared { owner, transposed } => {
                    write_u8(writer, SHARED)?;
                    write_u32(writer, owner)?;
                    write_u8(writer, u8::from(transposed))?;
                }
            }
        }
        Ok(())
    }

    /// Reads a complete network from `reader`.
    ///
    /// # Errors
    ///
    /// A truncated stream is `Io`. Unknown codes, bad boolean bytes and a
    /// shared copy whose owner has not been restored yet are format errors.
    /// A well-formed stream describing an invalid network (inconsistent
    /// shapes, bad pairings) is `InvalidConfig`, as from `from_specs`.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Network> {
        let layer_count = read_u32(reader)?;
        let loss = LossKind::from_code(read_u8(reader)?)?;

        let mut specs = Vec::with_capacity(layer_count.min(1024));
        let mut payloads = Vec::new();
        for i in 0..layer_count {
            let input_size = read_u32(reader)?;
            let output_size = read_u32(reader)?;
            let activation = Activation::from_code(read_u8(reader)?)?;
            let decay = read_f64(reader)?;
            let bias_suppression = read_bool(reader)?;

            let mut spec = LayerSpec::new(input_size, output_size, activation).with_decay(decay);
            spec.bias_suppression = bias_suppression;

            match read_u8(reader)? {
                OWNING => {
                    let weights = read_f64s(reader, input_size * output_size)?;
                    let biases = if bias_suppression {
                        Vec::new()
                    } else {
                        read_f64s(reader, output_size)?
                    };
                    payloads.push((i, weights, biases));
                }
                SHARED => {
                    let owner = read_u32(reader)?;
                    let transposed = read_bool(reader)?;
                    if owner >= i {
                        return Err(NetworkError::Format(format!(
                            "layer {} references owner {} before it is restored",
                            i, owner
                        )));
                    }
                    spec = spec.shared_with(owner, transposed);
                }
                other => return Err(NetworkError::UnknownOwnership(other)),
            }
            specs.push(spec);
        }

        let mut network = Network::from_specs(specs, loss)?;
        for (i, weights, biases) in payloads {
            let params = network.parameters_mut(i).ok_or_else(|| {
                NetworkError::InvalidConfig(format!("layer {} has no parameters", i))
            })?;
            params.weights_mut().copy_from_slice(&weights);
            params.biases_mut().copy_from_slice(&biases);
        }

        debug!(layers = layer_count, "deserialized network");
        Ok(network)
    }

    /// Replaces `self` with the network read from `reader`; on failure
    /// `self` is left untouched.
    pub fn load_from<R: Read>(&mut self, reader: &mut R) -> Result<()> {
        *self = Network::deserialize(reader)?;
        Ok(())
    }

    /// Saves the model to `path`.
    ///
    /// The stream is written to a sibling `<name>.tmp` file and renamed into
    /// place, so a failed save never leaves a truncated model at `path`.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = temp_sibling(path);

        let written = self.write_file(&tmp_path).and_then(|()| {
            fs::rename(&tmp_path, path)?;
            Ok(())
        });
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }

        info!(path = %path.display(), "saved model");
        Ok(())
    }

    fn write_file(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.serialize(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Network> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let network = Network::deserialize(&mut reader)?;
        info!(path = %path.as_ref().display(), "loaded model");
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_network() -> Network {
        let mut net = Network::new(&[3, 2], &[Activation::Tanh], &[None]).unwrap();
        net.initialize_random(5);
        net
    }

    #[test]
    fn test_header_layout() {
        let net = tiny_network();
        let mut bytes = Vec::new();
        net.serialize(&mut bytes).unwrap();

        assert_eq!(&bytes[0..4], &1u32.to_le_bytes());
        assert_eq!(bytes[4], LossKind::SquaredError.code());
        assert_eq!(&bytes[5..9], &3u32.to_le_bytes());
        assert_eq!(&bytes[9..13], &2u32.to_le_bytes());
        assert_eq!(bytes[13], Activation::Tanh.code());
        // decay (8) + bias flag (1) + ownership (1) + 6 weights + 2 biases
        assert_eq!(bytes.len(), 14 + 8 + 1 + 1 + 8 * 8);
    }

    #[test]
    fn test_unknown_loss_code() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.push(7);
        let err = Network::deserialize(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, NetworkError::UnknownLoss(7)));
    }

    #[test]
    fn test_truncated_stream_is_io_error() {
        let net = tiny_network();
        let mut bytes = Vec::new();
        net.serialize(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);

        let err = Network::deserialize(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, NetworkError::Io(_)));
    }
}
