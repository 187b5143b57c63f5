//! Prescription OCR: image upload, scan report, and tracker hand-off.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use carelink_common::{EventBus, Notification};
use tracing::{info, warn};

use crate::attachments::{Attachment, Medication, PrescriptionDetails};
use crate::backend::ScanBackend;
use crate::AssistantError;

/// An image to send to the OCR endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Already-encoded `data:image/...;base64,` URL, sent as JSON `imageData`.
    DataUrl(String),
    /// Raw file contents, sent as the multipart `image` field.
    File {
        bytes: Vec<u8>,
        filename: String,
        mime: String,
    },
}

impl ImageSource {
    /// Read an image file, guessing its MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prescription".into());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase());
        let mime = match ext.as_deref() {
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("bmp") => "image/bmp",
            _ => "image/jpeg",
        };
        Ok(Self::File {
            bytes,
            filename,
            mime: mime.into(),
        })
    }

    /// Encode as a data URL regardless of how the image was supplied.
    pub fn to_data_url(&self) -> String {
        match self {
            ImageSource::DataUrl(url) => url.clone(),
            ImageSource::File { bytes, mime, .. } => format!(
                "data:{mime};base64,{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        }
    }
}

/// Result of a successful scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub text: String,
    pub medications: Vec<Medication>,
}

impl ScanReport {
    /// "Add to tracker" is offered only when something was recognized.
    pub fn offers_tracker_action(&self) -> bool {
        !self.medications.is_empty()
    }

    pub fn to_attachment(&self) -> Attachment {
        Attachment::Prescription(PrescriptionDetails {
            doctor: None,
            issue_date: None,
            notes: None,
            medications: self.medications.clone(),
        })
    }
}

/// Sends images to the OCR endpoint and reports progress as notifications.
pub struct PrescriptionScanner {
    backend: Arc<dyn ScanBackend>,
    events: EventBus,
}

impl PrescriptionScanner {
    pub fn new(backend: Arc<dyn ScanBackend>, events: EventBus) -> Self {
        Self { backend, events }
    }

    pub async fn scan(&self, image: &ImageSource) -> Result<ScanReport, AssistantError> {
        let result = match self.backend.scan(image).await {
            Ok(resp) if resp.success => Ok(ScanReport {
                text: resp.text,
                medications: resp.medications,
            }),
            Ok(resp) => Err(AssistantError::Api {
                status: 200,
                message: resp
                    .error
                    .unwrap_or_else(|| "failed to scan prescription".into()),
            }),
            Err(e) => Err(e),
        };

        match &result {
            Ok(report) => {
                info!(medications = report.medications.len(), "prescription scanned");
                self.events.notify(Notification::info(
                    "Scan Complete",
                    format!(
                        "Found {} medications in your prescription.",
                        report.medications.len()
                    ),
                ));
            }
            Err(e) => {
                warn!(error = %e, "prescription scan failed");
                self.events.notify(Notification::error(
                    "Scan Failed",
                    "There was an error processing your prescription. Please try again.",
                ));
            }
        }
        result
    }

    /// Confirm the medications as tracked. Returns how many were added, or
    /// `None` when the report has nothing to add.
    pub fn add_to_tracker(&self, report: &ScanReport) -> Option<usize> {
        if !report.offers_tracker_action() {
            return None;
        }
        let count = report.medications.len();
        self.events.notify(Notification::info(
            "Medications Added",
            format!("{count} medications have been added to your tracking list."),
        ));
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScanResponse;
    use async_trait::async_trait;
    use carelink_common::Event;
    use std::io::Write;

    struct FakeScan(Result<ScanResponse, ()>);

    #[async_trait]
    impl ScanBackend for FakeScan {
        async fn scan(&self, _image: &ImageSource) -> Result<ScanResponse, AssistantError> {
            self.0
                .clone()
                .map_err(|_| AssistantError::Network("connection refused".into()))
        }
    }

    fn med(name: &str) -> Medication {
        Medication {
            name: name.into(),
            dosage: "10mg".into(),
            frequency: "daily".into(),
            start_date: None,
        }
    }

    fn next_notify(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> (String, String) {
        match rx.try_recv() {
            Ok(Event::Notify { title, body, .. }) => (title, body),
            other => panic!("expected notification, got {other:?}"),
        }
    }

    #[test]
    fn empty_report_offers_no_tracker_action() {
        let report = ScanReport {
            text: "illegible".into(),
            medications: vec![],
        };
        assert!(!report.offers_tracker_action());
        let scanner = PrescriptionScanner::new(
            Arc::new(FakeScan(Ok(ScanResponse::default()))),
            EventBus::default(),
        );
        assert_eq!(scanner.add_to_tracker(&report), None);
    }

    #[tokio::test]
    async fn successful_scan_notifies_count() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let scanner = PrescriptionScanner::new(
            Arc::new(FakeScan(Ok(ScanResponse {
                success: true,
                text: "Amoxicillin 500mg".into(),
                medications: vec![med("Amoxicillin"), med("Ibuprofen")],
                error: None,
            }))),
            events,
        );

        let report = scanner
            .scan(&ImageSource::DataUrl("data:image/png;base64,AAAA".into()))
            .await
            .unwrap();
        assert!(report.offers_tracker_action());
        assert_eq!(
            next_notify(&mut rx),
            (
                "Scan Complete".into(),
                "Found 2 medications in your prescription.".into()
            )
        );

        assert_eq!(scanner.add_to_tracker(&report), Some(2));
        assert_eq!(next_notify(&mut rx).0, "Medications Added");
    }

    #[tokio::test]
    async fn unsuccessful_body_is_an_error() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let scanner = PrescriptionScanner::new(
            Arc::new(FakeScan(Ok(ScanResponse {
                success: false,
                error: Some("no text found".into()),
                ..Default::default()
            }))),
            events,
        );
        let err = scanner
            .scan(&ImageSource::DataUrl("data:,".into()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no text found"));
        assert_eq!(next_notify(&mut rx).0, "Scan Failed");
    }

    #[tokio::test]
    async fn network_failure_notifies() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let scanner = PrescriptionScanner::new(Arc::new(FakeScan(Err(()))), events);
        assert!(matches!(
            scanner.scan(&ImageSource::DataUrl("data:,".into())).await,
            Err(AssistantError::Network(_))
        ));
        assert_eq!(next_notify(&mut rx).0, "Scan Failed");
    }

    #[test]
    fn from_path_reads_bytes_and_guesses_mime() {
        let mut file = tempfile::Builder::new().suffix(".PNG").tempfile().unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G']).unwrap();

        let image = ImageSource::from_path(file.path()).unwrap();
        match &image {
            ImageSource::File { bytes, mime, .. } => {
                assert_eq!(bytes.len(), 4);
                assert_eq!(mime, "image/png");
            }
            other => panic!("expected file, got {other:?}"),
        }
        assert_eq!(image.to_data_url(), "data:image/png;base64,iVBORw==");
    }
}
