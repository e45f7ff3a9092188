//! Program Image Loader
//!
//! Reads program images (code and initial data placed at chosen addresses)
//! from the binary image format or a plain text listing of cells.
//! This layer performs structural validation only.

use crate::bytecode::{encode_program, Instruction};
use crate::error::{FaultKind, LoadError};
use crate::vm::{Addr, Reg, VirtualMachine, Word};

/// Image magic: "CVMI"
pub const IMAGE_MAGIC: u32 = 0x4356_4D49;

/// Supported image version
const VERSION_MAJOR: u8 = 1;

/// Minimum image header size
const MIN_FILE_SIZE: usize = 16;

/// A contiguous block of cells placed at `base`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub base: usize,
    pub cells: Vec<Word>,
}

/// Loaded program image
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramImage {
    pub entry_point: usize,
    pub segments: Vec<Segment>,
}

impl ProgramImage {
    pub fn new(entry_point: usize) -> Self {
        ProgramImage {
            entry_point,
            segments: Vec::new(),
        }
    }

    /// Add a segment (builder style)
    pub fn segment(mut self, base: usize, cells: Vec<Word>) -> Self {
        self.segments.push(Segment { base, cells });
        self
    }

    /// Total number of cells across all segments
    pub fn cell_count(&self) -> usize {
        self.segments.iter().map(|s| s.cells.len()).sum()
    }

    /// Copy every segment into memory and point `ip` at the entry point.
    /// Later segments overwrite earlier ones where they overlap.
    ///
    /// Every segment and the entry point are checked before any cell is
    /// written, so a failed install leaves the machine untouched.
    pub fn install(&self, vm: &mut VirtualMachine) -> Result<(), FaultKind> {
        let capacity = vm.memory().capacity();
        for segment in &self.segments {
            match segment.base.checked_add(segment.cells.len()) {
                Some(end) if end <= capacity => {}
                _ => {
                    return Err(FaultKind::OutOfBounds {
                        address: segment.base.saturating_add(segment.cells.len()) as i64,
                    })
                }
            }
        }
        if self.entry_point >= capacity {
            return Err(FaultKind::OutOfBounds {
                address: self.entry_point as i64,
            });
        }

        for segment in &self.segments {
            vm.load(segment.base, &segment.cells)?;
        }
        vm.set_ip(self.entry_point)
    }

    /// Serialize to the binary image format.
    ///
    /// Fails if the entry point, a segment base or a segment length does not
    /// fit in the format's 32-bit fields.
    pub fn encode(&self) -> Result<Vec<u8>, LoadError> {
        let mut buf = Vec::with_capacity(MIN_FILE_SIZE + self.cell_count() * 4);
        buf.extend(&IMAGE_MAGIC.to_be_bytes());
        buf.push(VERSION_MAJOR);
        buf.push(0u8); // minor
        buf.push(0u8); // patch
        buf.push(0u8); // reserved
        buf.extend(&field("entry point", self.entry_point)?.to_be_bytes());
        buf.extend(&field("segment count", self.segments.len())?.to_be_bytes());
        for segment in &self.segments {
            buf.extend(&field("segment base", segment.base)?.to_be_bytes());
            buf.extend(&field("segment length", segment.cells.len())?.to_be_bytes());
            for cell in &segment.cells {
                buf.extend(&cell.to_be_bytes());
            }
        }
        Ok(buf)
    }
}

fn field(field: &'static str, value: usize) -> Result<u32, LoadError> {
    u32::try_from(value).map_err(|_| LoadError::FieldOverflow { field, value })
}

/// Image loader
pub struct ImageLoader;

impl ImageLoader {
    /// Load an image from raw bytes
    pub fn load(bytes: &[u8]) -> Result<ProgramImage, LoadError> {
        if bytes.len() < MIN_FILE_SIZE {
            return Err(LoadError::TooShort);
        }

        let mut cursor = 0;

        // Magic
        let magic = Self::read_u32(bytes, &mut cursor)?;
        if magic != IMAGE_MAGIC {
            return Err(LoadError::InvalidMagic(magic));
        }

        // Version
        let major = Self::read_u8(bytes, &mut cursor)?;
        let _minor = Self::read_u8(bytes, &mut cursor)?;
        let _patch = Self::read_u8(bytes, &mut cursor)?;

        if major != VERSION_MAJOR {
            return Err(LoadError::UnsupportedVersion(major));
        }

        // Reserved
        Self::read_u8(bytes, &mut cursor)?;

        let entry_point = Self::read_u32(bytes, &mut cursor)? as usize;

        let segment_count = Self::read_u32(bytes, &mut cursor)? as usize;
        let mut segments = Vec::new();

        for _ in 0..segment_count {
            let base = Self::read_u32(bytes, &mut cursor)? as usize;
            let len = Self::read_u32(bytes, &mut cursor)? as usize;
            if len.saturating_mul(4) > bytes.len() - cursor {
                return Err(LoadError::TooShort);
            }
            let mut cells = Vec::with_capacity(len);
            for _ in 0..len {
                cells.push(Self::read_i32(bytes, &mut cursor)?);
            }
            segments.push(Segment { base, cells });
        }

        Ok(ProgramImage {
            entry_point,
            segments,
        })
    }

    /// Parse a text listing.
    ///
    /// Cells are decimal integers separated by whitespace or commas.
    /// `@N` continues placement at address `N`, `entry N` sets the entry
    /// point, and `#` or `;` starts a comment.
    pub fn parse_text(source: &str) -> Result<ProgramImage, LoadError> {
        let mut image = ProgramImage::default();
        let mut current = Segment {
            base: 0,
            cells: Vec::new(),
        };

        for (idx, raw_line) in source.lines().enumerate() {
            let line = idx + 1;
            let code = raw_line
                .split(|c: char| c == '#' || c == ';')
                .next()
                .unwrap_or("");

            let mut tokens = code
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty());

            while let Some(token) = tokens.next() {
                if token.eq_ignore_ascii_case("entry") {
                    let arg = tokens.next().ok_or_else(|| LoadError::Syntax {
                        line,
                        message: "entry requires an address".to_string(),
                    })?;
                    image.entry_point = Self::parse_address(arg, line)?;
                } else if let Some(addr) = token.strip_prefix('@') {
                    let base = Self::parse_address(addr, line)?;
                    let finished = std::mem::replace(
                        &mut current,
                        Segment {
                            base,
                            cells: Vec::new(),
                        },
                    );
                    if !finished.cells.is_empty() {
                        image.segments.push(finished);
                    }
                } else {
                    let cell = token.parse::<Word>().map_err(|_| LoadError::InvalidToken {
                        line,
                        token: token.to_string(),
                    })?;
                    current.cells.push(cell);
                }
            }
        }

        if !current.cells.is_empty() {
            image.segments.push(current);
        }
        Ok(image)
    }

    fn parse_address(token: &str, line: usize) -> Result<usize, LoadError> {
        token.parse::<usize>().map_err(|_| LoadError::InvalidToken {
            line,
            token: token.to_string(),
        })
    }

    fn read_u8(bytes: &[u8], cursor: &mut usize) -> Result<u8, LoadError> {
        let v = *bytes.get(*cursor).ok_or(LoadError::TooShort)?;
        *cursor += 1;
        Ok(v)
    }

    fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, LoadError> {
        Ok(u32::from_be_bytes(Self::read_word_bytes(bytes, cursor)?))
    }

    fn read_i32(bytes: &[u8], cursor: &mut usize) -> Result<i32, LoadError> {
        Ok(i32::from_be_bytes(Self::read_word_bytes(bytes, cursor)?))
    }

    fn read_word_bytes(bytes: &[u8], cursor: &mut usize) -> Result<[u8; 4], LoadError> {
        let slice = bytes
            .get(*cursor..*cursor + 4)
            .ok_or(LoadError::TooShort)?;
        *cursor += 4;
        Ok([slice[0], slice[1], slice[2], slice[3]])
    }
}

/// Base address of the sample program's code
const SAMPLE_CODE_BASE: usize = 16;

/// Demonstration image: bumps the data cell at 5, then adds it to the cell
/// at 10 and reports both registers on ports 1 and 2.
///
/// Code lives at 16 so the data cells 5 and 10 do not overlap it.
/// Running it emits `Output(1, 6)` then `Output(2, 10)`.
pub fn sample_image() -> ProgramImage {
    let data = Addr::new(5);
    let other = Addr::new(10);
    let code = encode_program(&[
        Instruction::Load { reg: Reg::R5, addr: data },
        Instruction::Inc { reg: Reg::R5 },
        Instruction::Store { reg: Reg::R5, addr: data },
        Instruction::Load { reg: Reg::R0, addr: other },
        Instruction::Load { reg: Reg::R5, addr: data },
        Instruction::Add { dst: Reg::R5, src: Reg::R0 },
        Instruction::Inc { reg: Reg::R0 },
        Instruction::Out { port: 1, reg: Reg::R0 },
        Instruction::Out { port: 2, reg: Reg::R5 },
        Instruction::Hlt,
    ]);

    ProgramImage::new(SAMPLE_CODE_BASE)
        .segment(data.index(), vec![4])
        .segment(other.index(), vec![5])
        .segment(SAMPLE_CODE_BASE, code)
}
