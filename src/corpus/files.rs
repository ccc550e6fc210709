use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::KbFuzzError;
use crate::models::FileUpload;
use super::archive::{build_zip, workbook_with_sheet, worksheet_with_cell, DOCX_CONTENT_TYPES, DOCX_ROOT_RELS, DOCX_XXE_DOCUMENT};

/// Upload formats the target claims to ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Pdf,
    Xlsx,
    Markdown,
    Txt,
    Html,
    Docx,
}

impl FileFormat {
    pub const ALL: [FileFormat; 6] = [
        FileFormat::Pdf,
        FileFormat::Xlsx,
        FileFormat::Markdown,
        FileFormat::Txt,
        FileFormat::Html,
        FileFormat::Docx,
    ];

    /// Filename prefix, which doubles as the extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Markdown => "md",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Docx => "docx",
        }
    }

    fn variants(&self) -> &'static [VariantSpec] {
        match self {
            Self::Pdf => PDF_VARIANTS,
            Self::Xlsx => XLSX_VARIANTS,
            Self::Markdown => MARKDOWN_VARIANTS,
            Self::Txt => TXT_VARIANTS,
            Self::Html => HTML_VARIANTS,
            Self::Docx => DOCX_VARIANTS,
        }
    }
}

/// The structural hypothesis a corpus file tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectClass {
    Empty,
    HeaderOnly,
    Truncated,
    Oversized,
    NullBytes,
    WrongMagic,
    DeepNesting,
    ActiveContent,
    MalformedContainer,
    MissingParts,
    MalformedParts,
    EntityExpansion,
    UnclosedStructure,
    SpecialCharacters,
    InvalidEncoding,
    ControlCharacters,
}

#[derive(Debug, Clone, Copy)]
pub struct CorpusOptions {
    /// Body size for oversized-class variants.
    pub oversized_bytes: usize,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self { oversized_bytes: 5 * 1024 * 1024 }
    }
}

/// One generated artifact. The name encodes format, ordinal and defect.
#[derive(Debug, Clone)]
pub struct CorpusFile {
    pub format: FileFormat,
    pub defect: DefectClass,
    pub name: String,
    pub bytes: Vec<u8>,
}

type Builder = fn(&CorpusOptions) -> Result<Vec<u8>, KbFuzzError>;

struct VariantSpec {
    slug: &'static str,
    defect: DefectClass,
    build: Builder,
}

const fn variant(slug: &'static str, defect: DefectClass, build: Builder) -> VariantSpec {
    VariantSpec { slug, defect, build }
}

/// Generate every variant of one format. Deterministic; a failing variant
/// is logged and skipped, its ordinal left unused.
pub fn generate(format: FileFormat, options: &CorpusOptions) -> Vec<CorpusFile> {
    let mut files = Vec::new();
    for (i, variant) in format.variants().iter().enumerate() {
        let name = format!("{}_{:02}_{}.{}", format.extension(), i + 1, variant.slug, format.extension());
        match (variant.build)(options) {
            Ok(bytes) => files.push(CorpusFile { format, defect: variant.defect, name, bytes }),
            Err(e) => warn!(file = %name, error = %e, "Corpus variant skipped"),
        }
    }
    debug!(format = ?format, count = files.len(), "Generated corpus variants");
    files
}

pub fn generate_all(options: &CorpusOptions) -> Vec<CorpusFile> {
    FileFormat::ALL.iter().flat_map(|f| generate(*f, options)).collect()
}

/// Upload MIME type by extension.
pub fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("md") => "text/markdown",
        Some("txt") => "text/plain",
        Some("html") => "text/html",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

impl CorpusFile {
    pub fn to_upload(&self) -> FileUpload {
        FileUpload {
            filename: self.name.clone(),
            mime_type: mime_for(&self.name).to_string(),
            bytes: Arc::new(self.bytes.clone()),
        }
    }
}

pub async fn write_corpus(dir: &Path, files: &[CorpusFile]) -> Result<Vec<PathBuf>, KbFuzzError> {
    tokio::fs::create_dir_all(dir).await?;
    let mut written = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        tokio::fs::write(&path, &file.bytes).await?;
        written.push(path);
    }
    info!(dir = %dir.display(), count = written.len(), "Corpus written");
    Ok(written)
}

/// Every regular file in `dir`, sorted by name, as upload payloads.
pub async fn load_corpus(dir: &Path) -> Result<Vec<FileUpload>, KbFuzzError> {
    let pattern = dir.join("*");
    let pattern = pattern.to_str()
        .ok_or_else(|| KbFuzzError::Corpus(format!("non UTF-8 corpus path: {}", dir.display())))?;
    let entries = glob::glob(pattern)
        .map_err(|e| KbFuzzError::Corpus(format!("bad corpus pattern: {}", e)))?;

    let mut paths: Vec<PathBuf> = entries.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    paths.sort();

    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = tokio::fs::read(&path).await?;
        uploads.push(FileUpload {
            mime_type: mime_for(&filename).to_string(),
            filename,
            bytes: Arc::new(bytes),
        });
    }
    Ok(uploads)
}

/// Reuse an existing corpus directory, or generate and write a fresh one.
pub async fn prepare_corpus(dir: &Path, options: &CorpusOptions) -> Result<Vec<FileUpload>, KbFuzzError> {
    if dir.is_dir() {
        let existing = load_corpus(dir).await?;
        if !existing.is_empty() {
            info!(dir = %dir.display(), count = existing.len(), "Reusing existing corpus");
            return Ok(existing);
        }
    }
    let files = generate_all(options);
    write_corpus(dir, &files).await?;
    Ok(files.iter().map(CorpusFile::to_upload).collect())
}

// PDF

static PDF_VARIANTS: &[VariantSpec] = &[
    variant("empty", DefectClass::Empty, |_| Ok(Vec::new())),
    variant("header_only", DefectClass::HeaderOnly, |_| Ok(b"%PDF-1.4\n".to_vec())),
    variant("truncated", DefectClass::Truncated, |_| {
        Ok(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n2 0 obj\n<<".to_vec())
    }),
    variant("oversized", DefectClass::Oversized, pdf_oversized),
    variant("null_bytes", DefectClass::NullBytes, |_| {
        Ok(b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\n\x00\x00\x00\x00\nendobj\n%%EOF".to_vec())
    }),
    variant("fake_magic", DefectClass::WrongMagic, |_| {
        Ok(b"%PXF-9.9\nThis is not a real PDF\n%%EOF".to_vec())
    }),
    variant("deep_nested", DefectClass::DeepNesting, pdf_deep_nested),
    variant("javascript", DefectClass::ActiveContent, |_| {
        Ok(b"%PDF-1.4\n1 0 obj<< /Type /Catalog /OpenAction 3 0 R >>endobj\n3 0 obj<< /Type /Action /S /JavaScript /JS (app.alert('XSS')) >>endobj\n%%EOF".to_vec())
    }),
];

fn pdf_oversized(options: &CorpusOptions) -> Result<Vec<u8>, KbFuzzError> {
    let mut bytes = Vec::with_capacity(options.oversized_bytes + 16);
    bytes.extend_from_slice(b"%PDF-1.4\n");
    bytes.resize(bytes.len() + options.oversized_bytes, b'A');
    bytes.extend_from_slice(b"\n%%EOF");
    Ok(bytes)
}

fn pdf_deep_nested(_: &CorpusOptions) -> Result<Vec<u8>, KbFuzzError> {
    let mut doc = String::from("%PDF-1.4\n");
    for i in 1..=100 {
        doc.push_str(&format!("{} 0 obj\n<< /Type /Page /Parent {} 0 R >>\nendobj\n", i, i + 1));
    }
    doc.push_str("%%EOF");
    Ok(doc.into_bytes())
}

// XLSX

static XLSX_VARIANTS: &[VariantSpec] = &[
    variant("empty", DefectClass::Empty, |_| Ok(Vec::new())),
    variant("bad_zip", DefectClass::MalformedContainer, |_| {
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.resize(104, 0);
        Ok(bytes)
    }),
    variant("zip_no_excel", DefectClass::MissingParts, |_| {
        build_zip(&[("random.txt", b"This is not an Excel file")])
    }),
    variant("malicious_formula", DefectClass::ActiveContent, |_| {
        workbook_with_sheet(&worksheet_with_cell(r#"<c r="A1"><f>=CMD("calc")</f></c>"#))
    }),
    variant("huge_cell", DefectClass::Oversized, |_| {
        let cell = format!(r#"<c r="A1" t="inlineStr"><is><t>{}</t></is></c>"#, "X".repeat(100_000));
        workbook_with_sheet(&worksheet_with_cell(&cell))
    }),
    variant("null_bytes", DefectClass::NullBytes, |_| Ok(vec![0u8; 4096])),
];

// Markdown

static MARKDOWN_VARIANTS: &[VariantSpec] = &[
    variant("deep_headings", DefectClass::DeepNesting, |_| {
        let lines: Vec<String> = (1..=1000)
            .map(|i| format!("{} Heading {}", "#".repeat(i.min(6)), i))
            .collect();
        Ok(lines.join("\n").into_bytes())
    }),
    variant("many_links", DefectClass::Oversized, |_| {
        let host = "a".repeat(200);
        let lines: Vec<String> = (0..5000)
            .map(|i| format!("[link{}](http://{}.com/{})", i, host, i))
            .collect();
        Ok(lines.join("\n").into_bytes())
    }),
    variant("unclosed_codeblocks", DefectClass::UnclosedStructure, |_| {
        let doc = format!("{}print('hello')\n{}", "```python\n".repeat(100), "text\n".repeat(100));
        Ok(doc.into_bytes())
    }),
    variant("xss_injection", DefectClass::ActiveContent, |_| {
        Ok(concat!(
            "# Title\n<script>alert('XSS')</script>\n",
            "![img](javascript:alert('xss'))\n",
            "[Click](javascript:alert(document.cookie))\n",
            "<img src=x onerror=alert('xss')>\n<svg onload=alert('XSS')>\n",
            "{{7*7}}\n${7*7}\n",
        ).as_bytes().to_vec())
    }),
    variant("special_chars", DefectClass::SpecialCharacters, |_| {
        let symbols: String = (0x2600u32..0x2700).filter_map(char::from_u32).collect();
        Ok(format!("# Title\nParagraph with special chars\nUnicode: {}\n", symbols).into_bytes())
    }),
    variant("huge_table", DefectClass::Oversized, |_| {
        let row = format!("| {} | {} | {} |", "x".repeat(50), "y".repeat(50), "z".repeat(50));
        let rows = vec![row; 10_000].join("\n");
        Ok(format!("| C1 | C2 | C3 |\n|---|---|---|\n{}", rows).into_bytes())
    }),
];

// TXT

static TXT_VARIANTS: &[VariantSpec] = &[
    variant("long_line", DefectClass::Oversized, |_| Ok(vec![b'A'; 1024 * 1024])),
    variant("mixed_encoding", DefectClass::InvalidEncoding, |_| {
        let mut bytes = b"UTF-8: Hello\n".to_vec();
        bytes.extend_from_slice("中文".as_bytes());
        bytes.extend_from_slice(b"\xff\xfe");
        Ok(bytes)
    }),
    variant("control_chars", DefectClass::ControlCharacters, |_| {
        Ok((0u8..32).collect::<Vec<u8>>().repeat(100))
    }),
    variant("sql_injection", DefectClass::ActiveContent, |_| {
        Ok(b"SELECT * FROM users WHERE 1=1;\nDROP TABLE documents;--\n' OR '1'='1'; --\n".to_vec())
    }),
];

// HTML

static HTML_VARIANTS: &[VariantSpec] = &[
    variant("xss", DefectClass::ActiveContent, |_| {
        Ok(b"<html><body><script>alert('xss')</script><img src=x onerror=alert(1)></body></html>".to_vec())
    }),
    variant("deep_nested", DefectClass::DeepNesting, |_| {
        let doc = format!("<html><body>{}X{}</body></html>", "<div>".repeat(10_000), "</div>".repeat(10_000));
        Ok(doc.into_bytes())
    }),
    variant("large", DefectClass::Oversized, |_| {
        let doc = format!("<html><body>{}</body></html>", "<p>Paragraph</p>\n".repeat(50_000));
        Ok(doc.into_bytes())
    }),
    variant("malicious_meta", DefectClass::ActiveContent, |_| {
        Ok(br#"<html><head><meta http-equiv="refresh" content="0;url=javascript:alert(1)"><base href="http://evil.com/"></head><body>Normal</body></html>"#.to_vec())
    }),
];

// DOCX

static DOCX_VARIANTS: &[VariantSpec] = &[
    variant("empty", DefectClass::Empty, |_| Ok(Vec::new())),
    variant("corrupted_xml", DefectClass::MalformedParts, |_| {
        build_zip(&[
            ("word/document.xml", b"<corrupted>not valid<///>"),
            ("[Content_Types].xml", b"invalid"),
        ])
    }),
    variant("xxe", DefectClass::EntityExpansion, |_| {
        build_zip(&[
            ("word/document.xml", DOCX_XXE_DOCUMENT.as_bytes()),
            ("[Content_Types].xml", DOCX_CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", DOCX_ROOT_RELS.as_bytes()),
        ])
    }),
    variant("null", DefectClass::NullBytes, |_| Ok(vec![0u8; 2048])),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> CorpusOptions {
        CorpusOptions { oversized_bytes: 1024 }
    }

    #[test]
    fn test_generate_all_counts() {
        let files = generate_all(&small());
        assert_eq!(files.len(), 32);
        let pdfs = files.iter().filter(|f| f.format == FileFormat::Pdf).count();
        assert_eq!(pdfs, 8);
    }

    #[test]
    fn test_names_encode_format_and_defect() {
        let files = generate(FileFormat::Xlsx, &small());
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names[0], "xlsx_01_empty.xlsx");
        assert_eq!(names[3], "xlsx_04_malicious_formula.xlsx");
        assert_eq!(files[3].defect, DefectClass::ActiveContent);
        let md = generate(FileFormat::Markdown, &small());
        assert_eq!(md[0].name, "md_01_deep_headings.md");
    }

    #[test]
    fn test_names_unique() {
        let files = generate_all(&small());
        let mut names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), files.len());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate(FileFormat::Docx, &small());
        let b = generate(FileFormat::Docx, &small());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.bytes, y.bytes);
        }
    }

    #[test]
    fn test_oversized_pdf_within_tolerance_of_budget() {
        let budget = 5 * 1024 * 1024;
        let files = generate(FileFormat::Pdf, &CorpusOptions { oversized_bytes: budget });
        let oversized = files.iter().find(|f| f.defect == DefectClass::Oversized).unwrap();
        assert!(oversized.bytes.starts_with(b"%PDF-"));
        assert!(oversized.bytes.ends_with(b"%%EOF"));
        let delta = oversized.bytes.len().abs_diff(budget);
        assert!(delta <= 64, "size {} too far from {}", oversized.bytes.len(), budget);
    }

    #[test]
    fn test_wrong_magic_pdf() {
        let files = generate(FileFormat::Pdf, &small());
        let fake = files.iter().find(|f| f.defect == DefectClass::WrongMagic).unwrap();
        assert!(!fake.bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_deep_nested_pdf_has_100_objects() {
        let files = generate(FileFormat::Pdf, &small());
        let nested = files.iter().find(|f| f.name == "pdf_07_deep_nested.pdf").unwrap();
        let text = String::from_utf8_lossy(&nested.bytes);
        assert_eq!(text.matches(" 0 obj\n").count(), 100);
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("pdf_01_empty.pdf"), "application/pdf");
        assert_eq!(mime_for("A.DOCX"), "application/vnd.openxmlformats-officedocument.wordprocessingml.document");
        assert_eq!(mime_for("notes.md"), "text/markdown");
        assert_eq!(mime_for("blob.bin"), "application/octet-stream");
        assert_eq!(mime_for("no_extension"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_write_then_load_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let files = generate(FileFormat::Txt, &small());
        write_corpus(dir.path(), &files).await.unwrap();

        let loaded = load_corpus(dir.path()).await.unwrap();
        let names: Vec<&str> = loaded.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec![
            "txt_01_long_line.txt",
            "txt_02_mixed_encoding.txt",
            "txt_03_control_chars.txt",
            "txt_04_sql_injection.txt",
        ]);
        assert_eq!(loaded[0].mime_type, "text/plain");
        assert_eq!(loaded[0].bytes.len(), 1024 * 1024);
    }

    #[tokio::test]
    async fn test_prepare_corpus_reuses_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("custom.pdf"), b"%PDF-1.7").unwrap();
        let uploads = prepare_corpus(dir.path(), &small()).await.unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].filename, "custom.pdf");
    }

    #[tokio::test]
    async fn test_prepare_corpus_generates_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("corpus");
        let uploads = prepare_corpus(&target, &small()).await.unwrap();
        assert_eq!(uploads.len(), 32);
        assert!(target.join("pdf_01_empty.pdf").exists());
    }
}
