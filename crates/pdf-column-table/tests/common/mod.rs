#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::encryption::{decrypt_object, get_encryption_key};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

/// A string drawn at a fixed position with 10pt Courier.
#[derive(Debug, Clone, Copy)]
pub struct Run<'a> {
    pub x: i64,
    pub y: i64,
    pub text: &'a str,
    pub rotated: bool,
}

pub fn run(x: i64, y: i64, text: &str) -> Run<'_> {
    Run {
        x,
        y,
        text,
        rotated: false,
    }
}

pub fn rotated(x: i64, y: i64, text: &str) -> Run<'_> {
    Run {
        x,
        y,
        text,
        rotated: true,
    }
}

/// Rows of `(x, text)` cells laid out top-down from `top`, 20pt apart.
pub fn grid<'a>(top: i64, rows: &[&[(i64, &'a str)]]) -> Vec<Run<'a>> {
    let mut runs = Vec::new();
    let mut y = top;
    for row in rows {
        for &(x, text) in *row {
            runs.push(run(x, y, text));
        }
        y -= 20;
    }
    runs
}

pub fn create_positioned_pdf(
    path: &Path,
    pages: &[Vec<Run<'_>>],
) -> Result<(), Box<dyn std::error::Error>> {
    positioned_document(pages)?.save(path)?;
    Ok(())
}

/// Same document under the RC4 40-bit standard security handler with an
/// empty user password and the given `P` permissions.
pub fn create_encrypted_pdf(
    path: &Path,
    pages: &[Vec<Run<'_>>],
    permissions: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = positioned_document(pages)?;
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "Length" => 40,
        "O" => Object::string_literal(vec![0x5a_u8; 32]),
        "P" => permissions,
    });
    let file_id = Object::string_literal(b"outbreak-fixture".to_vec());
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);
    doc.trailer.set("Encrypt", encrypt_id);

    // RC4 is symmetric, so decrypting plain objects encrypts them.
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
        match doc.get_object_mut(id)? {
            Object::Stream(stream) => stream.set_content(cipher),
            Object::String(content, _) => *content = cipher,
            _ => {}
        }
    }

    doc.save(path)?;
    Ok(())
}

fn positioned_document(pages: &[Vec<Run<'_>>]) -> Result<Document, Box<dyn std::error::Error>> {
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

    let mut page_ids = Vec::new();

    for runs in pages {
        let mut operations = Vec::new();
        for text_run in runs {
            let matrix: [i64; 4] = if text_run.rotated {
                [0, 1, -1, 0]
            } else {
                [1, 0, 0, 1]
            };
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new(
                "Tm",
                vec![
                    matrix[0].into(),
                    matrix[1].into(),
                    matrix[2].into(),
                    matrix[3].into(),
                    text_run.x.into(),
                    text_run.y.into(),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(text_run.text)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// A disease-report style page: serial numbers on the left, a marker
/// column on the right and three data columns in between.
pub fn report_page<'a>() -> Vec<Run<'a>> {
    grid(
        700,
        &[
            &[(40, "1"), (100, "Maharashtra"), (250, "Cholera"), (400, "12"), (520, "*")],
            &[(40, "2"), (100, "Kerala"), (250, "Measles"), (400, "7"), (520, "*")],
            &[(40, "3"), (100, "Assam"), (250, "Dengue"), (400, "30"), (520, "*")],
        ],
    )
}
