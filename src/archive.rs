use anyhow::Context;
use std::io::{Cursor, Write};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Named byte buffers collected for one ZIP archive.
#[derive(Debug, Default)]
pub struct Archive {
    entries: Vec<(String, Vec<u8>)>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; an entry with the same name is replaced in place.
    pub fn add(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((name, data)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finish(self) -> anyhow::Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (name, data) in &self.entries {
            writer
                .start_file(name.as_str(), options)
                .with_context(|| format!("Failed to start archive entry {name}"))?;
            writer
                .write_all(data)
                .with_context(|| format!("Failed to write archive entry {name}"))?;
        }

        let cursor = writer.finish().context("Failed to finish archive")?;
        Ok(cursor.into_inner())
    }
}
