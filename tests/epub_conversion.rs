use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
};

use bionic_epub::{
    BionicConverter,
    config::{BionicConfig, ConfigBuilder},
    error::BionicError,
};
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::FileOptions};

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

const PACKAGE_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Sample</dc:title>
  </metadata>
  <manifest>
    <item id="ch1" href="text/ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="text/ch2.xhtml" media-type="application/xhtml+xml"/>
    <item id="cover" href="images/cover.png" media-type="image/png"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

const CHAPTER_ONE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Chapter One</title></head>
<body>
  <section epub:type="chapter">
    <h1>Beginning</h1>
    <p>Reading quickly &amp; carefully.</p>
    <pre>keep this exactly</pre>
  </section>
</body>
</html>"#;

const CHAPTER_TWO: &str = "<html><body><p class=\"unterminated>Broken chapter</p></body></html>";

const COVER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

fn write_epub(path: &Path) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let stored = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.add_directory("META-INF/", stored).unwrap();
    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(CONTAINER_XML.as_bytes()).unwrap();
    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(PACKAGE_OPF.as_bytes()).unwrap();
    zip.start_file("OEBPS/text/ch1.xhtml", deflated).unwrap();
    zip.write_all(CHAPTER_ONE.as_bytes()).unwrap();
    zip.start_file("OEBPS/text/ch2.xhtml", deflated).unwrap();
    zip.write_all(CHAPTER_TWO.as_bytes()).unwrap();
    zip.start_file("OEBPS/images/cover.png", stored).unwrap();
    zip.write_all(&COVER).unwrap();
    zip.finish().unwrap();
}

fn read_epub(path: &Path) -> Vec<(String, CompressionMethod, Vec<u8>)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        entries.push((file.name().to_string(), file.compression(), data));
    }
    entries
}

fn text(data: &[u8]) -> &str {
    std::str::from_utf8(data).unwrap()
}

#[test]
fn test_convert_epub() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.epub");
    write_epub(&input);

    let converter = BionicConverter::new(BionicConfig::default());
    let report = converter.convert_path(&input, None, &|_| {}).unwrap();

    let output = dir.path().join("Bionic_book.epub");
    let original = read_epub(&input);
    let converted = read_epub(&output);

    let names: Vec<&str> = converted.iter().map(|(name, _, _)| name.as_str()).collect();
    let original_names: Vec<&str> = original.iter().map(|(name, _, _)| name.as_str()).collect();
    assert_eq!(names, original_names);

    assert_eq!(converted[0].1, CompressionMethod::Stored);
    assert_eq!(converted[0].2, b"application/epub+zip");
    assert_eq!(converted[2].2, CONTAINER_XML.as_bytes());
    assert_eq!(converted[3].2, PACKAGE_OPF.as_bytes());
    assert_eq!(converted[6].2, COVER);

    let chapter = text(&converted[4].2);
    assert!(chapter.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE html>"));
    assert!(chapter.contains("<title>Chapter One</title>"));
    assert!(chapter.contains("<section epub:type=\"chapter\">"));
    assert!(chapter.contains("<h1><b>Begi</b>nning</h1>"));
    assert!(chapter.contains("<p><b>Rea</b>ding <b>qui</b>ckly &amp; <b>care</b>fully.</p>"));
    assert!(chapter.contains("<pre>keep this exactly</pre>"));

    // the broken chapter is passed through untouched
    assert_eq!(converted[5].2, CHAPTER_TWO.as_bytes());
    assert_eq!(report.entries, 7);
    assert_eq!(report.documents, 2);
    assert_eq!(report.converted, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].entry, "OEBPS/text/ch2.xhtml");
    assert!(matches!(
        report.warnings[0].error,
        BionicError::ParseError { .. }
    ));
}

#[test]
fn test_convert_epub_with_dark_theme() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.epub");
    let output = dir.path().join("out").join("themed.epub");
    write_epub(&input);

    let config = ConfigBuilder::new()
        .add_dark_theme(true)
        .num_threads(2)
        .build()
        .unwrap();
    let converter = BionicConverter::new(config);
    converter.convert_path(&input, Some(output.as_path()), &|_| {}).unwrap();

    let converted = read_epub(&output);
    assert_eq!(converted.len(), 8);
    assert_eq!(converted[0].0, "mimetype");

    let (name, _, css) = &converted[7];
    assert_eq!(name, "OEBPS/styles/bionic-dark-theme.css");
    assert!(text(css).contains("@media (prefers-color-scheme: dark)"));

    let package = text(&converted[3].2);
    assert!(package.contains("<dc:title>Sample</dc:title>"));
    assert!(package.contains(
        "<item id=\"bionic-dark-theme\" href=\"styles/bionic-dark-theme.css\" media-type=\"text/css\"/>"
    ));

    let chapter = text(&converted[4].2);
    assert!(chapter.contains("<style id=\"bionic-dark-theme\" type=\"text/css\">"));
    assert!(chapter.contains(
        "<link href=\"../styles/bionic-dark-theme.css\" rel=\"stylesheet\" type=\"text/css\"/>"
    ));
}

#[test]
fn test_convert_corrupt_epub_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.epub");
    fs::write(&input, b"PK\x03\x04 definitely not a complete archive").unwrap();

    let converter = BionicConverter::new(BionicConfig::default());
    let result = converter.convert_path(&input, None, &|_| {});

    assert!(matches!(result, Err(BionicError::ContainerError { .. })));
    assert!(!dir.path().join("Bionic_broken.epub").exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn test_convert_plain_text_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    let output = dir.path().join("notes.bionic.txt");
    fs::write(&input, "Fast reading with bionic text.\n").unwrap();

    let converter = BionicConverter::new(BionicConfig::default());
    let report = converter.convert_path(&input, Some(output.as_path()), &|_| {}).unwrap();

    assert_eq!(report.converted, 1);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "<b>Fa</b>st <b>rea</b>ding with <b>bio</b>nic <b>te</b>xt.\n"
    );
}
