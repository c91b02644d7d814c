use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn freightdoc() -> Command {
    Command::cargo_bin("freightdoc").unwrap()
}

/// One-page PDF showing `red` in red and `black` in black with Helvetica.
fn write_pdf(dir: &Path, name: &str, red: &str, black: &str) -> PathBuf {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
        Operation::new("rg", vec![Object::Integer(1), Object::Integer(0), Object::Integer(0)]),
        Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
        Operation::new("Tj", vec![Object::string_literal(red)]),
        Operation::new("g", vec![Object::Integer(0)]),
        Operation::new("Td", vec![Object::Integer(0), Object::Integer(-20)]),
        Operation::new("Tj", vec![Object::string_literal(black)]),
        Operation::new("ET", vec![]),
    ];
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        },
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    fs::write(&path, buf).unwrap();
    path
}

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Template" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="11"/><color rgb="FFFF0000"/><name val="Calibri"/></font>
  </fonts>
  <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
  <borders count="1"><border/></borders>
  <cellXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="0"/>
  </cellXfs>
</styleSheet>"#;

const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="A1" t="inlineStr"><is><t>Carrier</t></is></c><c r="B1" s="1" t="inlineStr"><is><t>DRIVER_NAME</t></is></c></row>
    <row r="2"><c r="A2"><v>12</v></c></row>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="A3:B3"/></mergeCells>
</worksheet>"#;

fn write_xlsx(dir: &Path, name: &str) -> PathBuf {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (part, content) in [
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", RELS),
        ("xl/styles.xml", STYLES),
        ("xl/worksheets/sheet1.xml", SHEET),
    ] {
        writer.start_file(part, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    let path = dir.join(name);
    fs::write(&path, writer.finish().unwrap().into_inner()).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    freightdoc()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_process_rejects_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contract.docx");
    fs::write(&path, b"not a contract").unwrap();

    freightdoc()
        .arg("process")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format: docx"));
}

#[test]
fn test_process_missing_file() {
    freightdoc()
        .args(["process", "/nonexistent/contract.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_workbook_json() {
    let dir = TempDir::new().unwrap();
    let path = write_xlsx(dir.path(), "template.xlsx");

    let output = freightdoc().arg("process").arg(&path).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["sheet_name"], "Template");
    assert_eq!(json["summary"]["total_cells_with_data"], 3);
    assert_eq!(json["summary"]["total_red_cells"], 1);
    assert_eq!(json["red_cells"][0]["coordinate"], "B1");
    assert_eq!(json["merged_cells"][0]["range"], "A3:B3");
}

#[test]
fn test_process_workbook_csv_and_grid() {
    let dir = TempDir::new().unwrap();
    let path = write_xlsx(dir.path(), "template.xlsx");

    freightdoc()
        .args(["process", "--format", "csv"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("coordinate,row,column,value"))
        .stdout(predicate::str::contains("B1,1,2,DRIVER_NAME,s,true,FFFF0000,,true"));

    freightdoc()
        .args(["process", "--grid", "--format", "text"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Carrier | *DRIVER_NAME*"));
}

#[test]
fn test_process_pdf_writes_output_file() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "contract.pdf", "Hello", "World");
    let out = dir.path().join("fields.json");

    freightdoc()
        .arg("process")
        .arg(&path)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Output written"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["success"], true);
    assert!(json["data"].as_object().unwrap().contains_key("customerInn"));
    assert!(json["full_text"].as_str().unwrap().contains("Hello"));
}

#[test]
fn test_process_invalid_pdf_fails() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.pdf");
    fs::write(&path, b"definitely not a pdf").unwrap();

    freightdoc()
        .arg("process")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse PDF"));
}

#[test]
fn test_inspect_reports_red_text() {
    let dir = TempDir::new().unwrap();
    let path = write_pdf(dir.path(), "marked.pdf", "Variable", "Fixed");

    freightdoc()
        .arg("inspect")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Total pages: 1"))
        .stdout(predicate::str::contains("Red text: \"Variable\""))
        .stdout(predicate::str::contains("Helvetica"));

    freightdoc()
        .args(["inspect", "--page", "2"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_batch_with_summary() {
    let dir = TempDir::new().unwrap();
    write_xlsx(dir.path(), "a.xlsx");
    write_pdf(dir.path(), "b.pdf", "Hello", "World");
    fs::write(dir.path().join("c.pdf"), b"broken").unwrap();
    let out_dir = dir.path().join("out");
    let pattern = format!("{}/*", dir.path().display());

    freightdoc()
        .args(["batch", &pattern, "--continue-on-error", "--summary", "--output-dir"])
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 successful, 1 failed"));

    assert!(out_dir.join("a.json").exists());
    assert!(out_dir.join("b.json").exists());
    let summary = fs::read_to_string(out_dir.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,status,kind"));
    assert!(summary.contains("a.xlsx,success,workbook,,3,1"));
    assert!(summary.contains("c.pdf,error"));
}

#[test]
fn test_batch_stops_on_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.pdf"), b"broken").unwrap();
    let pattern = format!("{}/*.pdf", dir.path().display());

    freightdoc()
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Processing failed"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");

    freightdoc()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    freightdoc()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "color.hex.min_red", "180"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set color.hex.min_red = 180"));

    freightdoc()
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "color.hex.min_red"])
        .assert()
        .success()
        .stdout(predicate::str::contains("180"));

    freightdoc()
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "color.hex.unknown", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));

    freightdoc()
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}
