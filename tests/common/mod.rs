#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::encryption::{decrypt_object, get_encryption_key};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// Writes a document whose pages hold `(x, y, text)` strings in 10pt Courier.
pub fn create_report_pdf(
    path: &Path,
    pages: &[Vec<(i64, i64, &str)>],
) -> Result<(), Box<dyn std::error::Error>> {
    report_document(pages)?.save(path)?;
    Ok(())
}

/// Encrypted with an empty user password and the "extract text" permission
/// bit cleared.
pub fn create_locked_report_pdf(
    path: &Path,
    pages: &[Vec<(i64, i64, &str)>],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = report_document(pages)?;
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => Object::string_literal(vec![0x5a_u8; 32]),
        "P" => -20,
    });
    let file_id = Object::string_literal(b"locked-fixture00".to_vec());
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);
    doc.trailer.set("Encrypt", encrypt_id);

    let key = get_encryption_key(&doc, "", false)?;
    let ids = doc
        .objects
        .keys()
        .copied()
        .filter(|id| *id != encrypt_id)
        .collect::<Vec<ObjectId>>();
    for id in ids {
        let Ok(cipher) = decrypt_object(&key, id, doc.get_object(id)?) else {
            continue;
        };
        if let Object::Stream(stream) = doc.get_object_mut(id)? {
            stream.set_content(cipher);
        }
    }

    doc.save(path)?;
    Ok(())
}

fn report_document(
    pages: &[Vec<(i64, i64, &str)>],
) -> Result<Document, Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut page_ids = Vec::new();
    for cells in pages {
        let mut operations = Vec::new();
        for &(x, y, text) in cells {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        page_ids.push(doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(doc)
}

/// Cover, contents and two outbreak table pages.
pub fn two_table_report<'a>() -> Vec<Vec<(i64, i64, &'a str)>> {
    let mut pages = weekly_report();
    pages.push(pages[2].clone());
    pages
}

/// Cover, contents and one outbreak table page.
pub fn weekly_report<'a>() -> Vec<Vec<(i64, i64, &'a str)>> {
    vec![
        vec![(200, 500, "Weekly Outbreaks")],
        vec![(100, 700, "Contents")],
        vec![
            (40, 700, "1"),
            (100, 700, "Maharashtra"),
            (250, 700, "Cholera"),
            (400, 700, "12"),
            (520, 700, "*"),
            (40, 680, "2"),
            (100, 680, "Kerala"),
            (250, 680, "Measles"),
            (400, 680, "7"),
            (520, 680, "*"),
        ],
    ]
}
