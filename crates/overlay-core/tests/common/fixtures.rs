//! Fixture PDFs built with lopdf

use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// A document whose pages all share `media_box`, each showing `page_text`
/// at (72, 720) when given.
pub fn pdf_with_pages(page_count: u32, media_box: [i64; 4], page_text: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for _ in 0..page_count {
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
        };
        if let Some(text) = page_text {
            let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
            page.set("Contents", Object::Reference(content_id));
        }
        kids.push(Object::Reference(doc.add_object(page)));
    }

    // MediaBox on the Pages node, inherited by every page
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
            "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn letter_pdf(page_count: u32) -> Vec<u8> {
    pdf_with_pages(page_count, [0, 0, 612, 792], None)
}
