//! Live voice relay between a browser client and the streaming model.
//!
//! [`VoiceSession`] is the synchronous state machine; [`run_voice_session`]
//! drives it from one task that owns capture framing and the playback
//! scheduler, so both are always cleared together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hirehelp_audio::{
    pcm, pcm_mime_type, CaptureFramer, Clock, PlaybackScheduler, INPUT_SAMPLE_RATE,
    OUTPUT_SAMPLE_RATE,
};
use hirehelp_bus::BusPublisher;
use hirehelp_provider::{LiveConnector, LiveEvent, LiveInput, LiveSetup};
use hirehelp_schema::{AppEvent, VoiceState};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

const REAP_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error("a voice session is already active")]
    Busy,
    #[error("live connection failed: {0}")]
    Connect(String),
    #[error("live session failed: {0}")]
    Session(String),
}

/// What the browser sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientFrame {
    Samples(Vec<f32>),
    Stop,
}

/// What the browser is told to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceOutput {
    State {
        state: VoiceState,
    },
    Play {
        id: u64,
        #[serde(rename = "startAt")]
        start_at: f64,
        duration: f64,
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
        pcm: String,
    },
    Cancel {
        ids: Vec<u64>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug)]
pub struct VoiceSession {
    id: Uuid,
    state: VoiceState,
    framer: CaptureFramer,
    scheduler: PlaybackScheduler,
}

impl Default for VoiceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: VoiceState::Idle,
            framer: CaptureFramer::default(),
            scheduler: PlaybackScheduler::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn scheduler(&self) -> &PlaybackScheduler {
        &self.scheduler
    }

    pub fn pending_capture(&self) -> usize {
        self.framer.pending_len()
    }

    pub fn begin_connect(&mut self) -> Vec<VoiceOutput> {
        if self.state != VoiceState::Idle {
            return Vec::new();
        }
        self.transition(VoiceState::Connecting)
    }

    /// Frames microphone samples into realtime input chunks. Samples that
    /// arrive before the session is open are dropped.
    pub fn capture(&mut self, samples: &[f32]) -> Vec<LiveInput> {
        if self.state != VoiceState::Open {
            return Vec::new();
        }
        self.framer
            .push(samples)
            .into_iter()
            .map(|frame| LiveInput::Audio {
                mime_type: pcm_mime_type(INPUT_SAMPLE_RATE),
                data: pcm::encode_base64(&frame),
            })
            .collect()
    }

    pub fn handle_event(&mut self, event: LiveEvent, now: f64) -> Vec<VoiceOutput> {
        match event {
            LiveEvent::SetupComplete => {
                if self.state == VoiceState::Connecting {
                    self.transition(VoiceState::Open)
                } else {
                    Vec::new()
                }
            }
            LiveEvent::Audio { mime_type, data } => {
                if self.state != VoiceState::Open {
                    return Vec::new();
                }
                let sample_rate = sample_rate_of(&mime_type);
                match pcm::decode_base64(&data, sample_rate, 1) {
                    Ok(buffer) if buffer.frame_count() > 0 => {
                        let chunk = self.scheduler.schedule_buffer(now, &buffer);
                        tracing::debug!(id = chunk.id, start_at = chunk.start_at, "audio chunk scheduled");
                        vec![VoiceOutput::Play {
                            id: chunk.id,
                            start_at: chunk.start_at,
                            duration: chunk.duration,
                            sample_rate,
                            pcm: data,
                        }]
                    }
                    Ok(_) => Vec::new(),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping undecodable audio chunk");
                        Vec::new()
                    }
                }
            }
            LiveEvent::Interrupted => {
                let ids = self.scheduler.interrupt();
                tracing::debug!(cancelled = ids.len(), "model interrupted");
                if ids.is_empty() {
                    Vec::new()
                } else {
                    vec![VoiceOutput::Cancel { ids }]
                }
            }
            LiveEvent::TurnComplete => Vec::new(),
            LiveEvent::Error(message) => {
                tracing::error!(session = %self.id, %message, "live session error");
                let mut out = vec![VoiceOutput::Error { message }];
                out.extend(self.teardown());
                out
            }
            LiveEvent::Closed { reason } => {
                tracing::info!(session = %self.id, ?reason, "live session closed");
                self.teardown()
            }
        }
    }

    /// Forgets chunks that have finished playing.
    pub fn reap(&mut self, now: f64) -> Vec<u64> {
        self.scheduler.reap(now)
    }

    /// Releases capture, cancels playback and returns to idle.
    pub fn teardown(&mut self) -> Vec<VoiceOutput> {
        if self.state == VoiceState::Idle {
            return Vec::new();
        }
        let mut out = Vec::new();
        let ids = self.scheduler.interrupt();
        if !ids.is_empty() {
            out.push(VoiceOutput::Cancel { ids });
        }
        self.framer.clear();
        out.extend(self.transition(VoiceState::Closed));
        out.extend(self.transition(VoiceState::Idle));
        out
    }

    fn transition(&mut self, next: VoiceState) -> Vec<VoiceOutput> {
        tracing::debug!(session = %self.id, from = ?self.state, to = ?next, "voice state");
        self.state = next;
        vec![VoiceOutput::State { state: next }]
    }
}

/// `audio/pcm;rate=24000` → 24000. Unlabelled audio is model output rate.
fn sample_rate_of(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|p| p.trim().strip_prefix("rate="))
        .find_map(|r| r.parse().ok())
        .unwrap_or(OUTPUT_SAMPLE_RATE)
}

/// Admits one live session at a time.
#[derive(Debug, Clone, Default)]
pub struct VoiceSlot {
    taken: Arc<AtomicBool>,
}

impl VoiceSlot {
    pub fn try_acquire(&self) -> Result<VoiceSlotGuard, VoiceError> {
        self.taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| VoiceError::Busy)?;
        Ok(VoiceSlotGuard {
            taken: self.taken.clone(),
        })
    }

    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }
}

pub struct VoiceSlotGuard {
    taken: Arc<AtomicBool>,
}

impl Drop for VoiceSlotGuard {
    fn drop(&mut self) {
        self.taken.store(false, Ordering::Release);
    }
}

struct Relay<'a> {
    session: VoiceSession,
    output: mpsc::Sender<VoiceOutput>,
    bus: &'a BusPublisher,
    client_gone: bool,
}

impl Relay<'_> {
    async fn emit(&mut self, outputs: Vec<VoiceOutput>) {
        for out in outputs {
            if let VoiceOutput::State { state } = out {
                let event = AppEvent::VoiceStateChanged {
                    session_id: self.session.id(),
                    state,
                };
                if let Err(e) = self.bus.publish(event).await {
                    tracing::warn!(error = %e, "failed to publish voice state");
                }
            }
            if !self.client_gone && self.output.send(out).await.is_err() {
                self.client_gone = true;
            }
        }
    }
}

/// Runs one session to completion: connect, relay until the client stops or
/// the service closes, then tear down.
pub async fn run_voice_session(
    connector: &dyn LiveConnector,
    setup: LiveSetup,
    mut client: mpsc::Receiver<ClientFrame>,
    output: mpsc::Sender<VoiceOutput>,
    clock: &dyn Clock,
    bus: &BusPublisher,
) -> Result<(), VoiceError> {
    let mut relay = Relay {
        session: VoiceSession::new(),
        output,
        bus,
        client_gone: false,
    };
    let connecting = relay.session.begin_connect();
    relay.emit(connecting).await;
    tracing::info!(session = %relay.session.id(), model = %setup.model, "voice session connecting");

    let mut channel = match connector.connect(setup).await {
        Ok(channel) => channel,
        Err(e) => {
            let message = e.to_string();
            let mut out = vec![VoiceOutput::Error {
                message: message.clone(),
            }];
            out.extend(relay.session.teardown());
            relay.emit(out).await;
            return Err(VoiceError::Connect(message));
        }
    };

    let mut reap = tokio::time::interval(REAP_INTERVAL);
    let mut stopping = false;
    let mut failure = None;

    loop {
        tokio::select! {
            frame = client.recv(), if !stopping => {
                match frame {
                    Some(ClientFrame::Samples(samples)) => {
                        for input in relay.session.capture(&samples) {
                            if channel.input.send(input).await.is_err() {
                                tracing::warn!("live input closed while sending audio");
                                break;
                            }
                        }
                    }
                    Some(ClientFrame::Stop) | None => {
                        tracing::info!(session = %relay.session.id(), "voice session stop requested");
                        stopping = true;
                        if channel.input.send(LiveInput::Close).await.is_err() {
                            let out = relay.session.teardown();
                            relay.emit(out).await;
                            break;
                        }
                    }
                }
            }
            event = channel.events.recv() => {
                match event {
                    Some(event) => {
                        if let LiveEvent::Error(message) = &event {
                            failure = Some(message.clone());
                        }
                        let out = relay.session.handle_event(event, clock.now());
                        relay.emit(out).await;
                        if relay.session.state() == VoiceState::Idle {
                            break;
                        }
                    }
                    None => {
                        let out = relay.session.teardown();
                        relay.emit(out).await;
                        break;
                    }
                }
            }
            _ = reap.tick() => {
                relay.session.reap(clock.now());
            }
        }

        if relay.client_gone && !stopping {
            stopping = true;
            if channel.input.send(LiveInput::Close).await.is_err() {
                tracing::warn!(session = %relay.session.id(), "live input closed before client hang-up could be relayed");
                let out = relay.session.teardown();
                relay.emit(out).await;
                break;
            }
        }
    }

    tracing::info!(session = %relay.session.id(), "voice session finished");
    match failure {
        Some(message) => Err(VoiceError::Session(message)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirehelp_audio::CAPTURE_FRAME_SAMPLES;

    fn open_session() -> VoiceSession {
        let mut session = VoiceSession::new();
        session.begin_connect();
        session.handle_event(LiveEvent::SetupComplete, 0.0);
        assert_eq!(session.state(), VoiceState::Open);
        session
    }

    /// 0.1 s of silence at 24 kHz.
    fn tenth_second() -> String {
        pcm::encode_base64(&[0.0; 2400])
    }

    fn audio(data: String) -> LiveEvent {
        LiveEvent::Audio {
            mime_type: "audio/pcm;rate=24000".into(),
            data,
        }
    }

    #[test]
    fn lifecycle_goes_idle_connecting_open_idle() {
        let mut session = VoiceSession::new();
        assert_eq!(
            session.begin_connect(),
            vec![VoiceOutput::State {
                state: VoiceState::Connecting
            }]
        );
        assert_eq!(
            session.handle_event(LiveEvent::SetupComplete, 0.0),
            vec![VoiceOutput::State {
                state: VoiceState::Open
            }]
        );
        let out = session.handle_event(LiveEvent::Closed { reason: None }, 1.0);
        assert_eq!(
            out,
            vec![
                VoiceOutput::State {
                    state: VoiceState::Closed
                },
                VoiceOutput::State {
                    state: VoiceState::Idle
                },
            ]
        );
        assert_eq!(session.state(), VoiceState::Idle);
    }

    #[test]
    fn capture_before_open_is_dropped() {
        let mut session = VoiceSession::new();
        session.begin_connect();
        assert!(session.capture(&[0.5; CAPTURE_FRAME_SAMPLES]).is_empty());
        assert_eq!(session.pending_capture(), 0);
    }

    #[test]
    fn capture_emits_whole_frames_with_input_mime() {
        let mut session = open_session();
        assert!(session.capture(&[0.1; 4000]).is_empty());
        let inputs = session.capture(&[0.1; 200]);
        assert_eq!(inputs.len(), 1);
        match &inputs[0] {
            LiveInput::Audio { mime_type, data } => {
                assert_eq!(mime_type, "audio/pcm;rate=16000");
                let bytes = pcm::decode_base64(data, INPUT_SAMPLE_RATE, 1).unwrap();
                assert_eq!(bytes.frame_count(), CAPTURE_FRAME_SAMPLES);
            }
            other => panic!("unexpected input: {other:?}"),
        }
        assert_eq!(session.pending_capture(), 4200 - CAPTURE_FRAME_SAMPLES);
    }

    #[test]
    fn audio_chunks_are_scheduled_back_to_back() {
        let mut session = open_session();
        let first = session.handle_event(audio(tenth_second()), 1.0);
        let second = session.handle_event(audio(tenth_second()), 1.02);

        match (&first[0], &second[0]) {
            (
                VoiceOutput::Play {
                    start_at: a,
                    duration: da,
                    sample_rate,
                    ..
                },
                VoiceOutput::Play { start_at: b, .. },
            ) => {
                assert_eq!(*sample_rate, 24_000);
                assert!((a - 1.0).abs() < 1e-9);
                assert!((da - 0.1).abs() < 1e-9);
                assert!((b - 1.1).abs() < 1e-9);
            }
            other => panic!("unexpected outputs: {other:?}"),
        }
    }

    #[test]
    fn interruption_cancels_everything_scheduled_before_it() {
        let mut session = open_session();
        session.handle_event(audio(tenth_second()), 0.0);
        session.handle_event(audio(tenth_second()), 0.0);

        let out = session.handle_event(LiveEvent::Interrupted, 0.05);
        assert_eq!(out, vec![VoiceOutput::Cancel { ids: vec![1, 2] }]);
        assert_eq!(session.scheduler().pending(), 0);
        assert_eq!(session.scheduler().next_start(), 0.0);

        let next = session.handle_event(audio(tenth_second()), 0.06);
        assert!(matches!(next[0], VoiceOutput::Play { start_at, .. } if (start_at - 0.06).abs() < 1e-9));
    }

    #[test]
    fn error_tears_down_and_reports() {
        let mut session = open_session();
        session.capture(&[0.1; 100]);
        session.handle_event(audio(tenth_second()), 0.0);

        let out = session.handle_event(LiveEvent::Error("boom".into()), 0.01);
        assert_eq!(out[0], VoiceOutput::Error { message: "boom".into() });
        assert!(out.contains(&VoiceOutput::Cancel { ids: vec![1] }));
        assert_eq!(session.state(), VoiceState::Idle);
        assert_eq!(session.pending_capture(), 0);
        assert_eq!(session.scheduler().pending(), 0);
    }

    #[test]
    fn undecodable_audio_is_skipped() {
        let mut session = open_session();
        assert!(session.handle_event(audio("!!!".into()), 0.0).is_empty());
        assert!(!session.handle_event(audio("AAE=".into()), 0.0).is_empty());
    }

    #[test]
    fn sample_rate_comes_from_mime() {
        assert_eq!(sample_rate_of("audio/pcm;rate=16000"), 16_000);
        assert_eq!(sample_rate_of("audio/pcm"), OUTPUT_SAMPLE_RATE);
        assert_eq!(sample_rate_of("audio/pcm; rate=bogus"), OUTPUT_SAMPLE_RATE);
    }

    #[test]
    fn play_output_serializes_camel_case() {
        let json = serde_json::to_value(VoiceOutput::Play {
            id: 3,
            start_at: 1.5,
            duration: 0.1,
            sample_rate: 24_000,
            pcm: "AAA=".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "play");
        assert_eq!(json["startAt"], 1.5);
        assert_eq!(json["sampleRate"], 24_000);
    }

    #[test]
    fn slot_admits_one_session() {
        let slot = VoiceSlot::default();
        let guard = slot.try_acquire().unwrap();
        assert!(matches!(slot.try_acquire(), Err(VoiceError::Busy)));
        drop(guard);
        assert!(!slot.is_taken());
        assert!(slot.try_acquire().is_ok());
    }
}
