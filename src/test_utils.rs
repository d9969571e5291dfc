pub mod test_helpers {
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::rc::Rc;
    use std::time::Duration;

    use crate::chat::{Attachment, BackendError, ChatBackend};
    use crate::documents::{PDF_CONTENT_TYPE, UploadCandidate};
    use crate::viewer::{
        DocumentSource, EngineError, LoadedDocument, PageGeometry, PdfEngine, PdfPage,
        RasterSurface, TextContent, TextItem,
    };

    /// US Letter in PDF points
    pub const LETTER: (f32, f32) = (612.0, 792.0);

    /// Call counters shared by a fake engine and everything it hands out
    #[derive(Debug, Default)]
    pub struct EngineStats {
        pub loads: Cell<usize>,
        pub page_fetches: Cell<usize>,
        /// (page number, scale) per raster render, in call order
        pub renders: RefCell<Vec<(usize, f32)>>,
        pub text_requests: Cell<usize>,
    }

    impl EngineStats {
        pub fn rendered_pages(&self) -> Vec<usize> {
            self.renders.borrow().iter().map(|(page, _)| *page).collect()
        }

        pub fn render_count(&self, page: usize) -> usize {
            self.renders.borrow().iter().filter(|(p, _)| *p == page).count()
        }
    }

    #[derive(Debug, Default)]
    struct Behaviour {
        page_size: (f32, f32),
        delay: Option<Duration>,
        fail_load: bool,
        failing_pages: HashSet<usize>,
        failing_text: HashSet<usize>,
    }

    /// In-memory decode collaborator with configurable failures and latency
    #[derive(Debug)]
    pub struct FakeEngine {
        total_pages: usize,
        behaviour: Rc<Behaviour>,
        stats: Rc<EngineStats>,
    }

    impl FakeEngine {
        pub fn new(total_pages: usize) -> Self {
            Self {
                total_pages,
                behaviour: Rc::new(Behaviour {
                    page_size: LETTER,
                    ..Behaviour::default()
                }),
                stats: Rc::new(EngineStats::default()),
            }
        }

        fn behaviour_mut(&mut self) -> &mut Behaviour {
            Rc::get_mut(&mut self.behaviour).expect("configure the engine before loading")
        }

        pub fn with_page_size(mut self, width: f32, height: f32) -> Self {
            self.behaviour_mut().page_size = (width, height);
            self
        }

        /// Document loads and raster renders sleep this long
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.behaviour_mut().delay = Some(delay);
            self
        }

        pub fn failing_load(mut self) -> Self {
            self.behaviour_mut().fail_load = true;
            self
        }

        pub fn failing_page(mut self, page: usize) -> Self {
            self.behaviour_mut().failing_pages.insert(page);
            self
        }

        pub fn failing_text(mut self, page: usize) -> Self {
            self.behaviour_mut().failing_text.insert(page);
            self
        }

        pub fn stats(&self) -> Rc<EngineStats> {
            Rc::clone(&self.stats)
        }
    }

    impl PdfEngine for FakeEngine {
        type Document = FakeDocument;

        async fn load(&self, source: &DocumentSource) -> Result<FakeDocument, EngineError> {
            self.stats.loads.set(self.stats.loads.get() + 1);
            if let Some(delay) = self.behaviour.delay {
                tokio::time::sleep(delay).await;
            }
            let corrupt = match source {
                DocumentSource::Blob(bytes) => !bytes.starts_with(b"%PDF-"),
                DocumentSource::Url(url) => url.is_empty(),
            };
            if self.behaviour.fail_load || corrupt {
                return Err(EngineError::Decode("not a PDF document".to_string()));
            }
            Ok(FakeDocument {
                total_pages: self.total_pages,
                behaviour: Rc::clone(&self.behaviour),
                stats: Rc::clone(&self.stats),
            })
        }
    }

    #[derive(Debug)]
    pub struct FakeDocument {
        total_pages: usize,
        behaviour: Rc<Behaviour>,
        stats: Rc<EngineStats>,
    }

    impl LoadedDocument for FakeDocument {
        type Page = FakePage;

        fn total_pages(&self) -> usize {
            self.total_pages
        }

        async fn page(&self, number: usize) -> Result<FakePage, EngineError> {
            self.stats.page_fetches.set(self.stats.page_fetches.get() + 1);
            if number == 0 || number > self.total_pages {
                return Err(EngineError::PageOutOfRange {
                    page: number,
                    total: self.total_pages,
                });
            }
            if self.behaviour.failing_pages.contains(&number) {
                return Err(EngineError::Render {
                    page: number,
                    detail: "corrupt page stream".to_string(),
                });
            }
            Ok(FakePage {
                number,
                behaviour: Rc::clone(&self.behaviour),
                stats: Rc::clone(&self.stats),
            })
        }
    }

    #[derive(Debug)]
    pub struct FakePage {
        number: usize,
        behaviour: Rc<Behaviour>,
        stats: Rc<EngineStats>,
    }

    impl PdfPage for FakePage {
        fn viewport(&self, scale: f32) -> PageGeometry {
            let (width, height) = self.behaviour.page_size;
            PageGeometry {
                width: width * scale,
                height: height * scale,
                scale,
            }
        }

        async fn render(&self, geometry: &PageGeometry) -> Result<RasterSurface, EngineError> {
            self.stats
                .renders
                .borrow_mut()
                .push((self.number, geometry.scale));
            if let Some(delay) = self.behaviour.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(RasterSurface {
                width_px: geometry.width.round() as u32,
                height_px: geometry.height.round() as u32,
                pixels: Vec::new(),
            })
        }

        async fn text_content(&self) -> Result<TextContent, EngineError> {
            self.stats
                .text_requests
                .set(self.stats.text_requests.get() + 1);
            if self.behaviour.failing_text.contains(&self.number) {
                return Err(EngineError::Render {
                    page: self.number,
                    detail: "no text layer".to_string(),
                });
            }
            Ok(TextContent {
                items: vec![TextItem {
                    text: format!("Page {}", self.number),
                    x: 72.0,
                    y: 72.0,
                    width: 100.0,
                    height: 12.0,
                }],
            })
        }
    }

    /// One recorded `ask` call
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct RecordedAsk {
        pub question: String,
        pub attachments: Vec<Attachment>,
    }

    impl RecordedAsk {
        pub fn filenames(&self) -> Vec<&str> {
            self.attachments.iter().map(|a| a.filename.as_str()).collect()
        }
    }

    /// Scripted backend that records every call
    #[derive(Debug, Default)]
    pub struct FakeBackend {
        replies: RefCell<VecDeque<Result<String, BackendError>>>,
        documents: HashMap<String, Vec<u8>>,
        asks: RefCell<Vec<RecordedAsk>>,
        fetches: RefCell<Vec<String>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the reply for the next `ask`. Unscripted asks get an empty
        /// answer.
        pub fn with_reply(self, reply: Result<String, BackendError>) -> Self {
            self.replies.borrow_mut().push_back(reply);
            self
        }

        pub fn with_answer(self, answer: &str) -> Self {
            self.with_reply(Ok(answer.to_string()))
        }

        /// Serve `bytes` for `url`; other URLs fail to fetch
        pub fn with_document(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.documents.insert(url.to_string(), bytes);
            self
        }

        pub fn asks(&self) -> Vec<RecordedAsk> {
            self.asks.borrow().clone()
        }

        pub fn fetches(&self) -> Vec<String> {
            self.fetches.borrow().clone()
        }
    }

    impl ChatBackend for FakeBackend {
        async fn ask(
            &self,
            question: &str,
            attachments: Vec<Attachment>,
        ) -> Result<String, BackendError> {
            self.asks.borrow_mut().push(RecordedAsk {
                question: question.to_string(),
                attachments,
            });
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(String::new()))
        }

        async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, BackendError> {
            self.fetches.borrow_mut().push(url.to_string());
            self.documents
                .get(url)
                .cloned()
                .ok_or_else(|| BackendError::Status {
                    status: 404,
                    error: Some("Not Found".to_string()),
                    message: None,
                })
        }
    }

    /// Minimal bytes that pass the `%PDF-` sniff
    pub fn pdf_bytes(tag: &str) -> Vec<u8> {
        format!("%PDF-1.7\n% {tag}\n").into_bytes()
    }

    pub fn pdf_upload(name: &str) -> UploadCandidate {
        UploadCandidate::new(name, PDF_CONTENT_TYPE, pdf_bytes(name))
    }
}
