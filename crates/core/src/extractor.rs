use crate::error::IngestError;
use crate::models::PageDocument;
use lopdf::Document;
use std::path::Path;
use tracing::info;

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageDocument>, IngestError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageDocument>, IngestError> {
        let document = Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;
        let source_path = path.to_string_lossy().to_string();

        // get_pages is keyed by the 1-indexed page position, so skipped pages leave gaps.
        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            if text.trim().is_empty() {
                continue;
            }

            pages.push(PageDocument {
                text,
                source_path: source_path.clone(),
                page_number: page_no,
            });
        }

        info!(pages = pages.len(), path = %path.display(), "loaded pdf pages");
        Ok(pages)
    }
}

pub fn load_pdf(path: &Path) -> Result<Vec<PageDocument>, IngestError> {
    LopdfExtractor.extract_pages(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::load_pdf;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::Path;
    use tempfile::tempdir;

    /// Writes a PDF with one page per entry; `None` produces a page with no text.
    pub(crate) fn write_pdf(path: &Path, pages: &[Option<&str>]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for page in pages {
            let operations = match page {
                Some(text) => vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
                None => Vec::new(),
            };
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("content should encode"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).expect("pdf should be written");
    }

    #[test]
    fn blank_pages_are_skipped_and_numbering_keeps_original_positions(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("three.pdf");
        write_pdf(&path, &[Some("First page"), None, Some("Third page")]);

        let pages = load_pdf(&path)?;

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert!(pages[0].text.contains("First page"));
        assert_eq!(pages[1].page_number, 3);
        assert!(pages[1].text.contains("Third page"));
        assert_eq!(pages[1].source_path, path.to_string_lossy());
        Ok(())
    }

    #[test]
    fn corrupt_file_is_a_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"%PDF-1.4\n%broken")?;

        let error = load_pdf(&path).unwrap_err();
        assert!(matches!(error, crate::IngestError::PdfParse(_)));
        Ok(())
    }
}
