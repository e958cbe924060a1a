#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use recital::bookmark::{Bookmark, BookmarkId, NewBookmark};
use recital::library::{BookId, BookPlaybackState, BookRecord, NewBook};
use recital::{
    BlobStore, ChapterDescriptor, RecordStore, SpeechEvent, Speaker, Utterance, UtteranceId,
};

/// Write entries into a ZIP in the given order.
pub fn zip_entries(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// XHTML chapter with one `<p>` per sentence.
pub fn chapter_markup(sentences: &[&str]) -> String {
    let body: String = sentences
        .iter()
        .map(|s| format!("<p>{s}</p>\n"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\"><head></head><body>\n{body}</body></html>"
    )
}

/// An EPUB 3 book under `OEBPS/` with a navigation document titling each
/// chapter "Part N" (1-based) and one `<p>` per sentence.
pub fn book_with_chapters(title: &str, chapters: &[&[&str]]) -> Vec<u8> {
    let mut manifest = String::from(
        r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>"#,
    );
    let mut spine = String::new();
    let mut nav_links = String::new();
    let mut files = Vec::new();

    for (i, sentences) in chapters.iter().enumerate() {
        let name = format!("ch{:02}.xhtml", i + 1);
        manifest.push_str(&format!(
            r#"<item id="c{i}" href="Text/{name}" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="c{i}"/>"#));
        nav_links.push_str(&format!(
            r#"<li><a href="Text/{name}">Part {}</a></li>"#,
            i + 1
        ));
        files.push((format!("OEBPS/Text/{name}"), chapter_markup(sentences)));
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>Test Author</dc:creator>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
    );
    let nav = format!(
        r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body><nav epub:type="toc"><ol>{nav_links}</ol></nav></body></html>"#
    );

    let mut entries: Vec<(&str, &[u8])> = vec![
        ("mimetype", b"application/epub+zip"),
        ("META-INF/container.xml", CONTAINER_XML.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
        ("OEBPS/nav.xhtml", nav.as_bytes()),
    ];
    for (name, markup) in &files {
        entries.push((name.as_str(), markup.as_bytes()));
    }
    zip_entries(&entries)
}

/// Records every utterance and reports nothing on its own; tests complete
/// utterances explicitly.
#[derive(Default)]
pub struct ScriptedSpeaker {
    spoken: Mutex<Vec<Utterance>>,
    cancels: Mutex<usize>,
    reject: Mutex<Vec<String>>,
}

impl ScriptedSpeaker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `speak` fail immediately for this text.
    pub fn reject(&self, text: &str) {
        self.reject.lock().unwrap().push(text.to_string());
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }

    pub fn last(&self) -> Option<Utterance> {
        self.spoken.lock().unwrap().last().cloned()
    }

    pub fn last_id(&self) -> UtteranceId {
        self.last().expect("nothing spoken").id
    }

    pub fn cancels(&self) -> usize {
        *self.cancels.lock().unwrap()
    }
}

#[async_trait]
impl Speaker for ScriptedSpeaker {
    async fn speak(&self, utterance: Utterance) -> recital::Result<()> {
        if self.reject.lock().unwrap().contains(&utterance.text) {
            return Err(recital::Error::Utterance(format!(
                "rejected {:?}",
                utterance.text
            )));
        }
        self.spoken.lock().unwrap().push(utterance);
        Ok(())
    }

    async fn cancel(&self) {
        *self.cancels.lock().unwrap() += 1;
    }
}

/// Completes every utterance as soon as it is spoken.
pub struct EchoSpeaker {
    events: UnboundedSender<SpeechEvent>,
    spoken: Mutex<Vec<String>>,
}

impl EchoSpeaker {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<SpeechEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let speaker = Arc::new(Self {
            events: tx,
            spoken: Mutex::new(Vec::new()),
        });
        (speaker, rx)
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for EchoSpeaker {
    async fn speak(&self, utterance: Utterance) -> recital::Result<()> {
        self.spoken.lock().unwrap().push(utterance.text);
        self.events
            .send(SpeechEvent::finished(utterance.id))
            .map_err(|e| recital::Error::Utterance(e.to_string()))
    }

    async fn cancel(&self) {}
}

/// Wraps a record store and logs every saved position.
pub struct CountingRecords<R> {
    inner: R,
    saves: Mutex<Vec<(BookId, BookPlaybackState)>>,
}

impl<R: RecordStore> CountingRecords<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn saves(&self) -> Vec<(BookId, BookPlaybackState)> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl<R: RecordStore> RecordStore for CountingRecords<R> {
    async fn insert_book(&self, book: NewBook) -> recital::Result<BookId> {
        self.inner.insert_book(book).await
    }

    async fn book(&self, id: BookId) -> recital::Result<Option<BookRecord>> {
        self.inner.book(id).await
    }

    async fn list_books(&self) -> recital::Result<Vec<BookRecord>> {
        self.inner.list_books().await
    }

    async fn find_by_filename(&self, filename: &str) -> recital::Result<Option<BookId>> {
        self.inner.find_by_filename(filename).await
    }

    async fn chapters(&self, id: BookId) -> recital::Result<Vec<ChapterDescriptor>> {
        self.inner.chapters(id).await
    }

    async fn replace_chapters(
        &self,
        id: BookId,
        chapters: Vec<ChapterDescriptor>,
    ) -> recital::Result<()> {
        self.inner.replace_chapters(id, chapters).await
    }

    async fn save_position(&self, id: BookId, position: BookPlaybackState) -> recital::Result<()> {
        self.saves.lock().unwrap().push((id, position));
        self.inner.save_position(id, position).await
    }

    async fn delete_book(&self, id: BookId) -> recital::Result<()> {
        self.inner.delete_book(id).await
    }

    async fn add_bookmark(&self, bookmark: NewBookmark) -> recital::Result<BookmarkId> {
        self.inner.add_bookmark(bookmark).await
    }

    async fn bookmarks(&self, book: BookId) -> recital::Result<Vec<Bookmark>> {
        self.inner.bookmarks(book).await
    }

    async fn remove_bookmark(&self, id: BookmarkId) -> recital::Result<()> {
        self.inner.remove_bookmark(id).await
    }
}

/// Wraps a blob store and counts archive reads.
pub struct CountingBlobs {
    inner: Arc<dyn BlobStore>,
    gets: Mutex<usize>,
}

impl CountingBlobs {
    pub fn new(inner: Arc<dyn BlobStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gets: Mutex::new(0),
        })
    }

    pub fn gets(&self) -> usize {
        *self.gets.lock().unwrap()
    }
}

#[async_trait]
impl BlobStore for CountingBlobs {
    async fn put(&self, id: BookId, bytes: Arc<[u8]>) -> recital::Result<()> {
        self.inner.put(id, bytes).await
    }

    async fn get(&self, id: BookId) -> recital::Result<Option<Arc<[u8]>>> {
        *self.gets.lock().unwrap() += 1;
        self.inner.get(id).await
    }

    async fn delete(&self, id: BookId) -> recital::Result<()> {
        self.inner.delete(id).await
    }
}
