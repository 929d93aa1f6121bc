//! Bounded zlib decompression and the block reader used for entry payloads.

use std::io::{self, Read};

use flate2::{read::ZlibDecoder, Decompress, FlushDecompress, Status};
use tracing::instrument;

/// Upper bound of the deflate expansion ratio, plus a little slack for tiny inputs.
const MAX_EXPANSION: usize = 1032;
const EXPANSION_SLACK: usize = 64;

/// Inflate a zlib stream into exactly `output_len` bytes.
///
/// Never reads past `input` and never writes more than `output_len` bytes. Filling the
/// output is enough to succeed, so a stream whose trailing checksum was cut off still
/// decodes. Anything that ends, stalls or fails before the output is full is an error.
#[instrument(skip(input), fields(input_len = input.len()), err)]
pub fn inflate_exact(input: &[u8], output_len: usize) -> io::Result<Vec<u8>> {
    if output_len > input.len().saturating_mul(MAX_EXPANSION) + EXPANSION_SLACK {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} bytes can not inflate to {output_len}", input.len()),
        ));
    }

    let mut output = vec![0u8; output_len];
    let mut inflater = Decompress::new(true);
    let mut written = 0usize;

    while written < output_len {
        let consumed = inflater.total_in() as usize;
        let status = inflater
            .decompress(
                &input[consumed..],
                &mut output[written..],
                FlushDecompress::None,
            )
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let produced = inflater.total_out() as usize;
        let progressed = produced != written || inflater.total_in() as usize != consumed;
        written = produced;

        if status == Status::StreamEnd || !progressed {
            break;
        }
    }

    if written != output_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflated {written} of {output_len} bytes"),
        ));
    }

    Ok(output)
}

/// Reader over the payload of a single entry
pub(crate) enum BlockReader<'a, R: Read> {
    /// Stored bytes, limited to the stored length
    Raw(io::Take<&'a mut R>),
    /// zlib stream limited on both the compressed and the decompressed side
    Compressed(Box<io::Take<ZlibDecoder<io::Take<&'a mut R>>>>),
    /// Payload that was fully materialised up front
    Buffered(io::Cursor<Vec<u8>>),
}

impl<'a, R: Read> BlockReader<'a, R> {
    pub fn raw(reader: &'a mut R, limit: u64) -> Self {
        BlockReader::Raw(reader.take(limit))
    }

    pub fn compressed(reader: &'a mut R, limit: u64, output_len: u64) -> Self {
        BlockReader::Compressed(Box::new(
            ZlibDecoder::new(reader.take(limit)).take(output_len),
        ))
    }

    pub fn buffered(data: Vec<u8>) -> Self {
        BlockReader::Buffered(io::Cursor::new(data))
    }

    /// Whether reads go through a decompressor
    pub fn is_compressed(&self) -> bool {
        matches!(self, BlockReader::Compressed(_))
    }
}

impl<R: Read> Read for BlockReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BlockReader::Raw(r) => r.read(buf),
            BlockReader::Compressed(r) => r.read(buf),
            BlockReader::Buffered(r) => r.read(buf),
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::{ErrorKind, Read, Write};

    use flate2::{write::ZlibEncoder, Compression};
    use pretty_assertions::assert_eq;

    use super::{inflate_exact, BlockReader};

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflate_to_declared_length() {
        let packed = deflate(b"Hello World");
        assert_eq!(inflate_exact(&packed, 11).unwrap(), b"Hello World");
    }

    #[test]
    fn missing_checksum_is_tolerated() {
        let packed = deflate(b"Hello World");
        let without_checksum = &packed[..packed.len() - 4];
        assert_eq!(inflate_exact(without_checksum, 11).unwrap(), b"Hello World");
    }

    #[test]
    fn output_is_never_overrun() {
        let packed = deflate(b"Hello World");
        assert_eq!(inflate_exact(&packed, 5).unwrap(), b"Hello");
    }

    #[test]
    fn short_stream_is_an_error() {
        let packed = deflate(b"Hello World");
        let err = inflate_exact(&packed, 64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn garbage_is_an_error() {
        let err = inflate_exact(&[0xFF; 16], 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn absurd_expansion_is_rejected_before_allocating() {
        let err = inflate_exact(&[0x78, 0x9C], u32::MAX as usize).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }

    #[test]
    fn compressed_block_is_bounded() {
        let mut input = deflate(b"Hello World");
        input.extend_from_slice(b"trailing");
        let limit = input.len() as u64 - 8;

        let mut source = std::io::Cursor::new(input);
        let mut reader = BlockReader::compressed(&mut source, limit, 5);
        assert!(reader.is_compressed());

        let mut actual = Vec::new();
        reader.read_to_end(&mut actual).unwrap();
        assert_eq!(actual, b"Hello");
    }

    #[test]
    fn raw_block_is_bounded() {
        let mut source = std::io::Cursor::new(b"Hello World".to_vec());
        let mut reader = BlockReader::raw(&mut source, 5);

        let mut actual = Vec::new();
        reader.read_to_end(&mut actual).unwrap();
        assert_eq!(actual, b"Hello");
    }
}
