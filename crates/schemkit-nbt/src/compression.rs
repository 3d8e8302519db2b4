use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Chain, Cursor, Read, Write};

/// First two bytes of every gzip member
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    None,
    #[default]
    Gzip,
}

type Peeked<R> = Chain<Cursor<Vec<u8>>, R>;

/// A stream that transparently gunzips when the input started with the gzip magic
pub enum DecompressingReader<R: Read> {
    Raw(Peeked<R>),
    Gzip(MultiGzDecoder<Peeked<R>>),
}

impl<R: Read> DecompressingReader<R> {
    /// Peeks the first two bytes and pushes them back in front of the rest of the stream
    pub fn new(mut reader: R) -> io::Result<Self> {
        let mut magic = [0u8; 2];
        let mut filled = 0;
        while filled < magic.len() {
            match reader.read(&mut magic[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        let stream = Cursor::new(magic[..filled].to_vec()).chain(reader);
        if filled == magic.len() && magic == GZIP_MAGIC {
            Ok(DecompressingReader::Gzip(MultiGzDecoder::new(stream)))
        } else {
            Ok(DecompressingReader::Raw(stream))
        }
    }

    pub fn compression(&self) -> Compression {
        match self {
            DecompressingReader::Raw(_) => Compression::None,
            DecompressingReader::Gzip(_) => Compression::Gzip,
        }
    }
}

impl<R: Read> Read for DecompressingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DecompressingReader::Raw(inner) => inner.read(buf),
            DecompressingReader::Gzip(inner) => inner.read(buf),
        }
    }
}

/// A sink that gzips when asked to. `finish` must be called to flush the gzip trailer.
pub enum CompressingWriter<W: Write> {
    Raw(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> CompressingWriter<W> {
    pub fn new(writer: W, compression: Compression) -> Self {
        match compression {
            Compression::None => CompressingWriter::Raw(writer),
            Compression::Gzip => {
                CompressingWriter::Gzip(GzEncoder::new(writer, flate2::Compression::default()))
            }
        }
    }

    pub fn finish(self) -> io::Result<W> {
        match self {
            CompressingWriter::Raw(mut inner) => {
                inner.flush()?;
                Ok(inner)
            }
            CompressingWriter::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for CompressingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressingWriter::Raw(inner) => inner.write(buf),
            CompressingWriter::Gzip(inner) => inner.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressingWriter::Raw(inner) => inner.flush(),
            CompressingWriter::Gzip(inner) => inner.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut writer = CompressingWriter::new(Vec::new(), Compression::Gzip);
        writer.write_all(data).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_detects_gzip_and_decompresses() {
        let packed = gzip(b"hello nbt");
        assert_eq!(&packed[..2], &GZIP_MAGIC);

        let mut reader = DecompressingReader::new(Cursor::new(packed)).unwrap();
        assert_eq!(reader.compression(), Compression::Gzip);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello nbt");
    }

    #[test]
    fn test_raw_input_keeps_peeked_bytes() {
        let mut reader = DecompressingReader::new(Cursor::new(vec![10u8, 0, 0, 0])).unwrap();
        assert_eq!(reader.compression(), Compression::None);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, vec![10, 0, 0, 0]);
    }

    #[test]
    fn test_short_inputs() {
        for input in [vec![], vec![0x1f]] {
            let mut reader = DecompressingReader::new(Cursor::new(input.clone())).unwrap();
            assert_eq!(reader.compression(), Compression::None);
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            assert_eq!(out, input);
        }
    }

    struct OneByteAtATime(Cursor<Vec<u8>>);

    impl Read for OneByteAtATime {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn test_detection_survives_short_reads() {
        let packed = gzip(b"slow");
        let mut reader = DecompressingReader::new(OneByteAtATime(Cursor::new(packed))).unwrap();
        assert_eq!(reader.compression(), Compression::Gzip);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"slow");
    }
}
