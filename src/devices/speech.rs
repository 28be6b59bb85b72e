//! Speech handler: one-shot digital bindings driven by a continuous,
//! interim-results recognition session.
//!
//! The handler is a small explicit state machine: the session is `Idle` or
//! `Recognizing`, and an independent `is_active` flag gates whether results
//! are applied. `start()`/`stop()` only toggle the flag, so repeated
//! `start()` calls are cheap and never restart a running session; results
//! arriving while inactive are discarded, not buffered. Speech bindings
//! have no `up` transition — an accepted transcript writes 1 exactly once
//! and stops the session so a near-simultaneous second match cannot land.

use crate::binding::{DeviceBindings, InputId, SharedInputState};
use crate::controller::detection::DetectionHook;
use crate::devices::{DeviceError, DeviceHandler, PropertyValue};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIDENCE: f64 = 0.5;
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Underlying recognition engine, owned by the handler.
///
/// `start`/`stop` are requests; the engine confirms asynchronously through
/// the handler's transition methods (`session_started`, `session_ended`,
/// `session_error`, `results`).
pub trait RecognitionSession: Send {
    fn start(&mut self, language: &str);
    fn stop(&mut self);

    /// Hard teardown of an in-flight session. Defaults to `stop`.
    fn abort(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub is_final: bool,
    /// Ordered best-first; only the top alternative is consulted.
    pub alternatives: Vec<RecognitionAlternative>,
}

/// One result event from the engine: the full result list plus the cursor
/// marking where unseen results begin.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBatch {
    pub result_index: usize,
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecognitionState {
    Idle,
    Recognizing,
}

pub struct SpeechHandler {
    bindings: DeviceBindings,
    input: SharedInputState,
    detection: Option<DetectionHook>,
    destroyed: bool,

    session: Option<Box<dyn RecognitionSession>>,
    state: RecognitionState,
    is_active: bool,

    language: String,
    required_confidence: f64,
    on_recognition_ended: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl SpeechHandler {
    pub const NAME: &'static str = "speech";

    pub fn new(bindings: DeviceBindings, input: SharedInputState) -> Self {
        Self {
            bindings,
            input,
            detection: None,
            destroyed: false,
            session: None,
            state: RecognitionState::Idle,
            is_active: false,
            language: DEFAULT_LANGUAGE.to_string(),
            required_confidence: DEFAULT_CONFIDENCE,
            on_recognition_ended: None,
        }
    }

    /// Hands the handler its recognition engine. Without one, `start()` only
    /// arms the active flag.
    pub fn attach_session(&mut self, session: Box<dyn RecognitionSession>) {
        self.session = Some(session);
    }

    /// Arms result application, starting the underlying session if idle.
    pub fn start(&mut self) {
        if self.destroyed || self.is_active {
            return;
        }
        if self.state == RecognitionState::Idle {
            if let Some(session) = &mut self.session {
                info!("starting speech recognition ({})", self.language);
                session.start(&self.language);
            }
        }
        self.is_active = true;
    }

    /// Disarms result application without stopping the session.
    pub fn stop(&mut self) {
        self.is_active = false;
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_recognizing(&self) -> bool {
        self.state == RecognitionState::Recognizing
    }

    /// Transition: the engine confirmed the session is running.
    pub fn session_started(&mut self) {
        debug!("speech recognition session started");
        self.state = RecognitionState::Recognizing;
    }

    /// Transition: the session ended on its own or after a stop request.
    pub fn session_ended(&mut self) {
        debug!("speech recognition session ended");
        self.finish_session();
    }

    /// Transition: the session died with an error; treated as an end.
    pub fn session_error(&mut self) {
        warn!("speech recognition session error");
        self.finish_session();
    }

    fn finish_session(&mut self) {
        self.state = RecognitionState::Idle;
        self.is_active = false;
        if let Some(hook) = &self.on_recognition_ended {
            hook();
        }
    }

    /// Transition: a result batch arrived from the engine.
    ///
    /// Results before the batch cursor were already seen. A result is
    /// accepted when final, or when its top alternative meets the required
    /// confidence. The first accepted transcript with a binding stops the
    /// session and writes exactly once.
    pub fn results(&mut self, batch: &ResultBatch) {
        if self.destroyed || !self.is_active {
            debug!("discarding speech results while inactive");
            return;
        }
        let detection = self.detection.clone();

        let fresh = batch.results.get(batch.result_index..).unwrap_or(&[]);
        for result in fresh {
            let Some(primary) = result.alternatives.first() else {
                continue;
            };
            if !result.is_final && primary.confidence < self.required_confidence {
                continue;
            }

            let input_id = InputId::token(primary.transcript.clone());
            if let Some(hook) = &detection {
                hook.emit(Self::NAME, input_id, false);
                return;
            }
            if let Some(binding) = self.bindings.get(&input_id) {
                if let Some(session) = &mut self.session {
                    session.stop();
                }
                info!(
                    "speech match '{}' -> {} = 1",
                    primary.transcript, binding.description
                );
                self.input.write().set(&binding.description, 1.0);
                return;
            }
        }
    }
}

impl DeviceHandler for SpeechHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configure(&mut self, property: &str, value: PropertyValue) -> Result<(), DeviceError> {
        match property {
            "language" => self.language = value.expect_text(property)?,
            "required_confidence" => self.required_confidence = value.expect_number(property)?,
            "on_recognition_ended" => {
                self.on_recognition_ended = Some(value.expect_callback(property)?)
            }
            _ => {
                return Err(DeviceError::UnsupportedProperty {
                    device: Self::NAME,
                    property: property.to_string(),
                })
            }
        }
        Ok(())
    }

    fn rebind(&mut self, bindings: DeviceBindings, input: SharedInputState) {
        self.bindings = bindings;
        self.input = input;
    }

    fn set_detection(&mut self, hook: Option<DetectionHook>) {
        self.detection = hook;
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        debug!("speech handler destroyed");
        if let Some(session) = &mut self.session {
            session.abort();
        }
        self.session = None;
        self.state = RecognitionState::Idle;
        self.is_active = false;
        self.bindings.clear();
        self.detection = None;
        self.destroyed = true;
    }
}

impl std::fmt::Debug for SpeechHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechHandler")
            .field("state", &self.state)
            .field("is_active", &self.is_active)
            .field("language", &self.language)
            .field("required_confidence", &self.required_confidence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::config::BindingSpec;
    use crate::binding::state::shared_state;
    use crate::binding::{BindingTable, BindingsConfig};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted engine recording start/stop calls.
    #[derive(Default)]
    struct FakeSession {
        starts: Arc<AtomicUsize>,
        stops: Arc<AtomicUsize>,
    }

    impl RecognitionSession for FakeSession {
        fn start(&mut self, _language: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn handler_with(
        specs: &[(&str, BindingSpec)],
    ) -> (SpeechHandler, SharedInputState, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let mut config = BindingsConfig::new();
        for (description, spec) in specs {
            config.bind(*description, spec.clone());
        }
        let input = shared_state();
        let mut table = BindingTable::new();
        table.apply(&config, &input);

        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let mut handler = SpeechHandler::new(table.device(SpeechHandler::NAME), input.clone());
        handler.attach_session(Box::new(FakeSession {
            starts: starts.clone(),
            stops: stops.clone(),
        }));
        (handler, input, starts, stops)
    }

    fn batch(results: &[(&str, f64, bool)]) -> ResultBatch {
        ResultBatch {
            result_index: 0,
            results: results
                .iter()
                .map(|(transcript, confidence, is_final)| RecognitionResult {
                    is_final: *is_final,
                    alternatives: vec![RecognitionAlternative {
                        transcript: transcript.to_string(),
                        confidence: *confidence,
                    }],
                })
                .collect(),
        }
    }

    #[test]
    fn start_is_cheap_while_recognizing() {
        let (mut handler, _input, starts, _stops) = handler_with(&[]);

        handler.start();
        handler.session_started();
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        // Re-arming an active handler and re-starting after a stop() while
        // the session still runs must not touch the engine again.
        handler.start();
        handler.stop();
        handler.start();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(handler.is_active());
    }

    #[test]
    fn low_confidence_interim_result_is_ignored() {
        let (mut handler, input, _starts, _stops) =
            handler_with(&[("halt", BindingSpec::new("speech", "stop"))]);

        handler.start();
        handler.session_started();
        handler.results(&batch(&[("stop", 0.2, false)]));
        assert_eq!(input.read().value("halt"), 0.0);
    }

    #[test]
    fn final_result_accepted_regardless_of_confidence() {
        let (mut handler, input, _starts, stops) =
            handler_with(&[("halt", BindingSpec::new("speech", "stop"))]);

        handler.start();
        handler.session_started();
        handler.results(&batch(&[("stop", 0.0, true)]));

        assert_eq!(input.read().value("halt"), 1.0);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn confident_interim_result_accepted() {
        let (mut handler, input, _starts, _stops) =
            handler_with(&[("halt", BindingSpec::new("speech", "stop"))]);

        handler.start();
        handler.session_started();
        handler.results(&batch(&[("stop", 0.9, false)]));
        assert_eq!(input.read().value("halt"), 1.0);
    }

    #[test]
    fn acceptance_applies_exactly_one_write() {
        let (mut handler, input, _starts, stops) = handler_with(&[
            ("halt", BindingSpec::new("speech", "stop")),
            ("launch", BindingSpec::new("speech", "go")),
        ]);

        handler.start();
        handler.session_started();
        handler.results(&batch(&[("stop", 0.9, true), ("go", 0.9, true)]));

        assert_eq!(input.read().value("halt"), 1.0);
        assert_eq!(input.read().value("launch"), 0.0);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn result_index_cursor_skips_seen_results() {
        let (mut handler, input, _starts, _stops) =
            handler_with(&[("halt", BindingSpec::new("speech", "stop"))]);

        handler.start();
        handler.session_started();

        let mut seen = batch(&[("stop", 0.9, true), ("other", 0.9, true)]);
        seen.result_index = 1;
        handler.results(&seen);
        assert_eq!(input.read().value("halt"), 0.0);
    }

    #[test]
    fn results_while_inactive_are_discarded() {
        let (mut handler, input, _starts, _stops) =
            handler_with(&[("halt", BindingSpec::new("speech", "stop"))]);

        handler.start();
        handler.session_started();
        handler.stop();
        handler.results(&batch(&[("stop", 0.9, true)]));
        assert_eq!(input.read().value("halt"), 0.0);
    }

    #[test]
    fn session_end_fires_hook_and_deactivates() {
        let (mut handler, _input, _starts, _stops) = handler_with(&[]);
        let ended = Arc::new(AtomicUsize::new(0));
        let counter = ended.clone();
        handler
            .configure(
                "on_recognition_ended",
                PropertyValue::callback(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        handler.start();
        handler.session_started();
        handler.session_ended();

        assert!(!handler.is_active());
        assert!(!handler.is_recognizing());
        assert_eq!(ended.load(Ordering::SeqCst), 1);

        handler.start();
        handler.session_started();
        handler.session_error();
        assert_eq!(ended.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn detection_reports_accepted_transcript_without_write() {
        let (mut handler, input, _starts, _stops) =
            handler_with(&[("halt", BindingSpec::new("speech", "stop"))]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        handler.set_detection(Some(DetectionHook::new(Arc::new(move |event| {
            sink.lock().push(event)
        }))));

        handler.start();
        handler.session_started();
        handler.results(&batch(&[("stop", 0.9, true)]));

        assert_eq!(input.read().value("halt"), 0.0);
        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].input_id, InputId::token("stop"));
        assert!(!events[0].is_axis);
    }

    #[test]
    fn configure_validates_property_and_shape() {
        let (mut handler, _input, _starts, _stops) = handler_with(&[]);

        handler.configure("language", "de-DE".into()).unwrap();
        handler
            .configure("required_confidence", PropertyValue::Number(0.8))
            .unwrap();

        let err = handler
            .configure("volume", PropertyValue::Number(1.0))
            .unwrap_err();
        assert!(matches!(err, DeviceError::UnsupportedProperty { .. }));

        let err = handler
            .configure("language", PropertyValue::Number(1.0))
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidValue { .. }));
    }

    #[test]
    fn destroy_aborts_session_and_discards_results() {
        let (mut handler, input, _starts, stops) =
            handler_with(&[("halt", BindingSpec::new("speech", "stop"))]);

        handler.start();
        handler.session_started();
        handler.destroy();
        assert_eq!(stops.load(Ordering::SeqCst), 1);

        handler.results(&batch(&[("stop", 0.9, true)]));
        assert_eq!(input.read().value("halt"), 0.0);
        handler.destroy(); // idempotent
    }
}
