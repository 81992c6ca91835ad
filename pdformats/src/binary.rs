//! BIN/PDX: a compiled Playdate executable, re-synthesised as a minimal
//! ARMv7-M ELF32 relocatable object. Grounded on `loaders/pdbin.py`'s
//! `PDBinFile` for the header shape; its `to_elffile` was never filled in
//! (`# todo`), so the ELF synthesis itself is original.

use pdtool_macros::ToBytes;

use crate::byteorder::WriteBytesLe;
use crate::container::read_magic;
use crate::error::BinaryError;
use crate::reader::BinReader;

pub const MAGIC_PDX: &[u8] = b"Playdate PDX";
pub const MAGIC_BIN: &[u8] = b"Playdate BIN";

const CODE_FILE_OFFSET: u32 = 0x10000;

#[derive(Debug)]
pub struct Binary {
    pub md5: [u8; 16],
    pub code_size: u32,
    pub mem_size: u32,
    /// §3's `event_handler_offset`; §6 pins `Binary::to_elf`'s `e_entry`
    /// to this field. `unknown1` stays opaque and unconsulted.
    pub unknown0: u32,
    pub unknown1: u32,
    pub code: Vec<u8>,
    pub relocations: Vec<u32>,
}

const LEGACY_BASE: u32 = 0x6000_000c;

impl Binary {
    /// Parses either BIN variant: version 2 (magic-prefixed) or legacy (no
    /// magic at all, three absolute-address `u32`s followed by raw code).
    /// Peeks the first 12 bytes to tell them apart.
    pub fn parse_any(reader: &mut BinReader) -> Result<Self, BinaryError> {
        let mut probe = reader.clone();
        let head = probe.readbin(12);
        if head == MAGIC_PDX || head == MAGIC_BIN {
            Self::parse(reader, false)
        } else {
            Self::parse_legacy(reader)
        }
    }

    /// Legacy (no-magic) BIN: three `u32`s, each an absolute address that
    /// becomes `event_handler`/`filesz`/`memsz` once `0x6000000c` (the
    /// link-time base the Playdate toolchain assumes) is subtracted off;
    /// the remainder of the file is raw code.
    fn parse_legacy(reader: &mut BinReader) -> Result<Self, BinaryError> {
        let event_handler = reader.readu32()?.wrapping_sub(LEGACY_BASE);
        let filesz = reader.readu32()?.wrapping_sub(LEGACY_BASE);
        let memsz = reader.readu32()?.wrapping_sub(LEGACY_BASE);
        let code = reader.readbin_all();
        Ok(Self::legacy(event_handler, filesz, memsz, code))
    }

    pub fn parse(reader: &mut BinReader, skip_magic: bool) -> Result<Self, BinaryError> {
        read_magic(reader, "BIN", MAGIC_PDX, Some(MAGIC_BIN), skip_magic)?;

        let flags = reader.readu32()?;
        let compressed = flags & 0x8000_0000 != 0;

        let md5_bytes = reader.readbin(16);
        let mut md5 = [0u8; 16];
        md5.copy_from_slice(&md5_bytes);

        let code_size = reader.readu32()?;
        let mem_size = reader.readu32()?;
        let unknown0 = reader.readu32()?;
        let unknown1 = reader.readu32()?;

        reader.decompress(compressed, "BIN code/relocations")?;

        let offset = reader.tell();
        let code = reader.readbin(code_size as usize);
        if code.len() != code_size as usize {
            return Err(BinaryError::BadFormat {
                offset,
                detail: format!(
                    "declared code_size {} exceeds available {} byte(s)",
                    code_size,
                    code.len()
                ),
            });
        }

        let mut relocations = Vec::new();
        while reader.remaining() >= 4 {
            relocations.push(reader.readu32()?);
        }

        Ok(Self {
            md5,
            code_size,
            mem_size,
            unknown0,
            unknown1,
            code,
            relocations,
        })
    }

    /// Constructs a `Binary` from the legacy (no-magic) variant's three
    /// already-rebased fields and raw code. See `parse_legacy`.
    pub fn legacy(event_handler: u32, filesz: u32, memsz: u32, code: Vec<u8>) -> Self {
        Self {
            md5: [0u8; 16],
            code_size: filesz,
            mem_size: memsz,
            unknown0: event_handler,
            unknown1: 0,
            code,
            relocations: Vec::new(),
        }
    }

    /// Synthesises a minimal ARMv7-M ELF32 relocatable object: one
    /// LOAD-equivalent code region at file offset `0x10000`, seven section
    /// headers (`NULL, .text, .bss, .rel.text, .symtab, .strtab, .shstrtab`).
    pub fn to_elf(&self) -> Vec<u8> {
        let shstrtab = b"\0.text\0.bss\0.rel.text\0.symtab\0.strtab\0.shstrtab\0";
        let name_text = 1u32;
        let name_bss = 7u32;
        let name_rel = 12u32;
        let name_symtab = 22u32;
        let name_strtab = 30u32;
        let name_shstrtab = 38u32;

        let reloc_bytes_len = self.relocations.len() * 8; // Elf32_Rel is 8 bytes
        let bss_size = self.mem_size.saturating_sub(self.code_size);

        let ehsize = 52u32;
        let phentsize = 32u32;
        let phnum = 1u32;
        let shentsize = 40u32;
        let shnum = 7u32;

        let phoff = ehsize;
        let code_off = CODE_FILE_OFFSET;
        let rel_off = code_off + self.code_size;
        let symtab_off = rel_off + reloc_bytes_len as u32;
        // one null symbol, matching an empty-but-valid symtab
        let symtab_size = 16u32;
        let strtab_off = symtab_off + symtab_size;
        let strtab = b"\0";
        let shstrtab_off = strtab_off + strtab.len() as u32;
        let shoff = shstrtab_off + shstrtab.len() as u32;

        let ehdr = ElfHeader {
            e_ident: [
                0x7f, b'E', b'L', b'F', 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            ],
            e_type: 2, // ET_REL
            e_machine: 0x28,
            e_version: 1,
            // `unknown0` is the version-2 header's post-MD5 `event_handler_offset`
            // field (§3); §6 pins `e_entry` to it directly.
            e_entry: self.unknown0,
            e_phoff: phoff,
            e_shoff: shoff,
            e_flags: 0,
            e_ehsize: ehsize as u16,
            e_phentsize: phentsize as u16,
            e_phnum: phnum as u16,
            e_shentsize: shentsize as u16,
            e_shnum: shnum as u16,
            e_shstrndx: (shnum - 1) as u16,
        };

        let phdr = ProgramHeader {
            p_type: 1, // PT_LOAD
            p_offset: code_off,
            p_vaddr: 0,
            p_paddr: 0,
            p_filesz: self.code_size,
            p_memsz: self.mem_size,
            p_flags: 7, // RWX
            p_align: 0x10000,
        };

        let sh_null = SectionHeader::zero();
        let sh_text = SectionHeader {
            sh_name: name_text,
            sh_type: 1, // PROGBITS
            sh_flags: 0x6, // ALLOC | EXECINSTR
            sh_addr: 0,
            sh_offset: code_off,
            sh_size: self.code_size,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 4,
            sh_entsize: 0,
        };
        let sh_bss = SectionHeader {
            sh_name: name_bss,
            sh_type: 8, // NOBITS
            sh_flags: 0x3, // WRITE | ALLOC
            sh_addr: self.code_size,
            sh_offset: code_off + self.code_size,
            sh_size: bss_size,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 4,
            sh_entsize: 0,
        };
        let sh_rel = SectionHeader {
            sh_name: name_rel,
            sh_type: 9, // REL
            sh_flags: 0,
            sh_addr: 0,
            sh_offset: rel_off,
            sh_size: reloc_bytes_len as u32,
            sh_link: 4, // .symtab section index
            sh_info: 1, // applies to .text section index
            sh_addralign: 4,
            sh_entsize: 8,
        };
        let sh_symtab = SectionHeader {
            sh_name: name_symtab,
            sh_type: 2, // SYMTAB
            sh_flags: 0,
            sh_addr: 0,
            sh_offset: symtab_off,
            sh_size: symtab_size,
            sh_link: 5, // .strtab section index
            sh_info: 1,
            sh_addralign: 4,
            sh_entsize: 16,
        };
        let sh_strtab = SectionHeader {
            sh_name: name_strtab,
            sh_type: 3, // STRTAB
            sh_flags: 0,
            sh_addr: 0,
            sh_offset: strtab_off,
            sh_size: strtab.len() as u32,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 1,
            sh_entsize: 0,
        };
        let sh_shstrtab = SectionHeader {
            sh_name: name_shstrtab,
            sh_type: 3, // STRTAB
            sh_flags: 0,
            sh_addr: 0,
            sh_offset: shstrtab_off,
            sh_size: shstrtab.len() as u32,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 1,
            sh_entsize: 0,
        };

        let mut out = Vec::new();
        ehdr.write_le(&mut out);
        phdr.write_le(&mut out);
        out.resize(code_off as usize, 0);
        out.extend_from_slice(&self.code);
        for reloc in &self.relocations {
            reloc.write_le(&mut out);
            0u32.write_le(&mut out); // r_info: placeholder symbol/type
        }
        out.resize(symtab_off as usize, 0);
        out.resize((symtab_off + symtab_size) as usize, 0); // null symbol entry
        out.extend_from_slice(strtab);
        out.extend_from_slice(shstrtab);

        out.resize(shoff as usize, 0);
        sh_null.write_le(&mut out);
        sh_text.write_le(&mut out);
        sh_bss.write_le(&mut out);
        sh_rel.write_le(&mut out);
        sh_symtab.write_le(&mut out);
        sh_strtab.write_le(&mut out);
        sh_shstrtab.write_le(&mut out);

        out
    }
}

#[derive(ToBytes)]
struct ElfHeader {
    e_ident: [u8; 16],
    e_type: u16,
    e_machine: u16,
    e_version: u32,
    e_entry: u32,
    e_phoff: u32,
    e_shoff: u32,
    e_flags: u32,
    e_ehsize: u16,
    e_phentsize: u16,
    e_phnum: u16,
    e_shentsize: u16,
    e_shnum: u16,
    e_shstrndx: u16,
}

#[derive(ToBytes)]
struct ProgramHeader {
    p_type: u32,
    p_offset: u32,
    p_vaddr: u32,
    p_paddr: u32,
    p_filesz: u32,
    p_memsz: u32,
    p_flags: u32,
    p_align: u32,
}

#[derive(ToBytes)]
struct SectionHeader {
    sh_name: u32,
    sh_type: u32,
    sh_flags: u32,
    sh_addr: u32,
    sh_offset: u32,
    sh_size: u32,
    sh_link: u32,
    sh_info: u32,
    sh_addralign: u32,
    sh_entsize: u32,
}

impl SectionHeader {
    fn zero() -> Self {
        Self {
            sh_name: 0,
            sh_type: 0,
            sh_flags: 0,
            sh_addr: 0,
            sh_offset: 0,
            sh_size: 0,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 0,
            sh_entsize: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_header_parses() {
        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate PDX");
        body.extend_from_slice(&0u32.to_le_bytes()); // uncompressed
        body.extend_from_slice(&[0xAB; 16]); // md5
        body.extend_from_slice(&4u32.to_le_bytes()); // code_size
        body.extend_from_slice(&8u32.to_le_bytes()); // mem_size
        body.extend_from_slice(&0u32.to_le_bytes()); // unknown0
        body.extend_from_slice(&0u32.to_le_bytes()); // unknown1
        body.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]); // code

        let mut r = BinReader::from_bytes(body);
        let bin = Binary::parse(&mut r, false).unwrap();
        assert_eq!(bin.code, vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(bin.mem_size, 8);
        assert!(bin.relocations.is_empty());
    }

    #[test]
    fn parse_any_recognises_legacy_no_magic_variant() {
        let mut body = Vec::new();
        body.extend_from_slice(&(LEGACY_BASE + 4).to_le_bytes()); // event_handler
        body.extend_from_slice(&(LEGACY_BASE + 4).to_le_bytes()); // filesz
        body.extend_from_slice(&(LEGACY_BASE + 8).to_le_bytes()); // memsz
        body.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]); // code

        let mut r = BinReader::from_bytes(body);
        let bin = Binary::parse_any(&mut r).unwrap();
        assert_eq!(bin.code, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(bin.code_size, 4);
        assert_eq!(bin.mem_size, 8);
    }

    #[test]
    fn parse_any_recognises_v2_magic() {
        let mut body = Vec::new();
        body.extend_from_slice(b"Playdate BIN");
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&[0u8; 16]);
        body.extend_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(&2u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&[0x01, 0x02]);

        let mut r = BinReader::from_bytes(body);
        let bin = Binary::parse_any(&mut r).unwrap();
        assert_eq!(bin.code, vec![0x01, 0x02]);
    }

    #[test]
    fn elf_header_starts_with_magic() {
        let bin = Binary::legacy(0x1234, 4, 8, vec![0xde, 0xad, 0xbe, 0xef]);
        let elf = bin.to_elf();
        assert_eq!(&elf[0..4], &[0x7f, b'E', b'L', b'F']);
        assert_eq!(elf[4], 1); // ELFCLASS32
        assert_eq!(u16::from_le_bytes([elf[18], elf[19]]), 0x28); // e_machine ARM
        let e_entry = u32::from_le_bytes([elf[24], elf[25], elf[26], elf[27]]);
        assert_eq!(e_entry, 0x1234); // e_entry wired to event_handler_offset
    }
}
