//! Per-elementary-stream queueing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::error::FlvSourceError;
use crate::events::StreamEvent;
use crate::media_type::MediaType;
use crate::sample::MediaSample;
use crate::source::SourceCommand;

/// Stream identifier of the video stream.
pub const VIDEO_STREAM_ID: u32 = 0;

/// Stream identifier of the audio stream.
pub const AUDIO_STREAM_ID: u32 = 1;

/// One elementary stream of the source.
///
/// The handle is co-owned: the source delivers samples into it, the host
/// pulls samples out of it. The host requests one sample at a time with
/// [`request_sample`](FlvStream::request_sample) and receives it as a
/// [`StreamEvent::Sample`] on the stream's event queue; requests that cannot
/// be matched immediately raise demand back to the source's demux loop.
///
/// All state sits behind one mutex that is never held across an await.
#[derive(Debug, Clone)]
pub struct FlvStream {
    inner: Arc<Mutex<StreamInner>>,
}

#[derive(Debug)]
struct StreamInner {
    stream_id: u32,
    media_type: MediaType,
    active: bool,
    started: bool,
    paused: bool,
    shutdown: bool,
    end_of_stream: bool,
    end_of_stream_sent: bool,
    requests: VecDeque<Option<u64>>,
    samples: VecDeque<MediaSample>,
    events: mpsc::UnboundedSender<StreamEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<StreamEvent>>,
    demand: mpsc::UnboundedSender<SourceCommand>,
}

impl StreamInner {
    // A latched end-of-stream fires once the ready queue drains.
    fn check_end_of_stream(&mut self) {
        if self.end_of_stream && !self.end_of_stream_sent && self.samples.is_empty() {
            self.end_of_stream_sent = true;
            let _ = self.events.send(StreamEvent::EndOfStream);
            let _ = self.demand.send(SourceCommand::EndOfStream {
                stream_id: self.stream_id,
            });
        }
    }
}

impl FlvStream {
    pub(crate) fn new(stream_id: u32, media_type: MediaType, demand: mpsc::UnboundedSender<SourceCommand>) -> Self {
        let (events, events_rx) = mpsc::unbounded_channel();

        FlvStream {
            inner: Arc::new(Mutex::new(StreamInner {
                stream_id,
                media_type,
                active: false,
                started: false,
                paused: false,
                shutdown: false,
                end_of_stream: false,
                end_of_stream_sent: false,
                requests: VecDeque::new(),
                samples: VecDeque::new(),
                events,
                events_rx: Some(events_rx),
                demand,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StreamInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The stream identifier.
    pub fn stream_id(&self) -> u32 {
        self.lock().stream_id
    }

    /// The stream's media type.
    pub fn media_type(&self) -> MediaType {
        self.lock().media_type.clone()
    }

    /// Takes the stream's event receiver. Yields `Some` exactly once.
    pub fn take_events(&self) -> Option<mpsc::UnboundedReceiver<StreamEvent>> {
        self.lock().events_rx.take()
    }

    /// Requests one sample.
    ///
    /// If a demultiplexed sample is already queued it is matched and emitted
    /// immediately; otherwise the request is queued and the demux loop is
    /// signalled. The matched sample carries `token` back to the caller.
    pub fn request_sample(&self, token: Option<u64>) -> Result<(), FlvSourceError> {
        let mut inner = self.lock();

        if inner.shutdown {
            return Err(FlvSourceError::Shutdown);
        }
        if !inner.active {
            return Err(FlvSourceError::NotAccepting);
        }

        if let Some(mut sample) = inner.samples.pop_front() {
            sample.token = token;
            let _ = inner.events.send(StreamEvent::Sample(sample));
            inner.check_end_of_stream();
        } else {
            inner.requests.push_back(token);
            let _ = inner.demand.send(SourceCommand::RequestData);
        }

        Ok(())
    }

    /// Hands a demultiplexed sample to the stream: matched to the oldest
    /// pending request, or queued until one arrives.
    pub(crate) fn deliver_payload(&self, mut sample: MediaSample) {
        let mut inner = self.lock();

        if inner.shutdown || !inner.active {
            return;
        }

        if let Some(token) = inner.requests.pop_front() {
            sample.token = token;
            let _ = inner.events.send(StreamEvent::Sample(sample));
            inner.check_end_of_stream();
        } else {
            inner.samples.push_back(sample);
        }
    }

    /// Latches end-of-stream; the event fires once the ready queue drains.
    pub(crate) fn end_of_stream(&self) {
        let mut inner = self.lock();

        if inner.shutdown || !inner.active {
            return;
        }

        inner.end_of_stream = true;
        inner.check_end_of_stream();
    }

    /// Whether the demux loop should produce a sample for this stream.
    pub(crate) fn needs_data(&self) -> bool {
        let inner = self.lock();

        inner.active
            && inner.started
            && !inner.paused
            && !inner.shutdown
            && !inner.end_of_stream
            && !inner.requests.is_empty()
            && inner.samples.is_empty()
    }

    /// Activates or deactivates the stream, returning whether it was active
    /// before. Deactivation clears both queues.
    pub(crate) fn activate(&self, selected: bool) -> bool {
        let mut inner = self.lock();

        let was_active = inner.active;
        inner.active = selected;
        if !selected {
            inner.requests.clear();
            inner.samples.clear();
        }

        was_active
    }

    pub(crate) fn start(&self, time: i64, is_seek: bool) {
        let mut inner = self.lock();

        if inner.shutdown || !inner.active {
            return;
        }

        inner.started = true;
        inner.paused = false;
        inner.end_of_stream = false;
        inner.end_of_stream_sent = false;

        if is_seek {
            // queued samples predate the new position
            inner.samples.clear();
            let _ = inner.events.send(StreamEvent::Seeked { time });
        } else {
            let _ = inner.events.send(StreamEvent::Started { time });
        }
    }

    pub(crate) fn pause(&self) {
        let mut inner = self.lock();

        if inner.shutdown || !inner.active {
            return;
        }

        inner.paused = true;
        let _ = inner.events.send(StreamEvent::Paused);
    }

    pub(crate) fn stop(&self) {
        let mut inner = self.lock();

        if inner.shutdown || !inner.active {
            return;
        }

        inner.requests.clear();
        inner.samples.clear();
        inner.started = false;
        inner.paused = false;
        let _ = inner.events.send(StreamEvent::Stopped);
    }

    pub(crate) fn shutdown(&self) {
        let mut inner = self.lock();

        inner.shutdown = true;
        inner.active = false;
        inner.started = false;
        inner.requests.clear();
        inner.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::sync::mpsc;

    use super::*;
    use crate::media_type::{AudioMediaType, AudioSubtype};

    fn media_type() -> MediaType {
        MediaType::Audio(AudioMediaType {
            subtype: AudioSubtype::Mp3,
            samples_per_second: 44100,
            channels: 2,
            bits_per_sample: 16,
            block_align: 1,
            avg_bitrate: 0,
            user_data: Bytes::new(),
        })
    }

    fn sample(time: i64) -> MediaSample {
        MediaSample {
            buffers: vec![Bytes::from_static(&[1, 2, 3])],
            time,
            key_frame: false,
            token: None,
        }
    }

    // An activated, started stream with the Started event already consumed.
    fn stream() -> (
        FlvStream,
        mpsc::UnboundedReceiver<StreamEvent>,
        mpsc::UnboundedReceiver<SourceCommand>,
    ) {
        let (demand, demand_rx) = mpsc::unbounded_channel();
        let stream = FlvStream::new(AUDIO_STREAM_ID, media_type(), demand);
        stream.activate(true);
        stream.start(0, false);

        let mut events = stream.take_events().unwrap();
        assert!(stream.take_events().is_none());
        assert!(matches!(events.try_recv().unwrap(), StreamEvent::Started { time: 0 }));

        (stream, events, demand_rx)
    }

    #[test]
    fn unstarted_stream_raises_no_demand() {
        let (demand, _demand_rx) = mpsc::unbounded_channel();
        let stream = FlvStream::new(AUDIO_STREAM_ID, media_type(), demand);
        stream.activate(true);

        stream.request_sample(None).unwrap();
        assert!(!stream.needs_data());

        stream.start(0, false);
        assert!(stream.needs_data());
    }

    #[tokio::test]
    async fn request_then_deliver() {
        let (stream, mut events, mut demand_rx) = stream();

        stream.request_sample(Some(7)).unwrap();
        assert!(matches!(demand_rx.recv().await.unwrap(), SourceCommand::RequestData));
        assert!(stream.needs_data());

        stream.deliver_payload(sample(100));
        let StreamEvent::Sample(delivered) = events.recv().await.unwrap() else {
            panic!("expected a sample");
        };
        assert_eq!(delivered.time, 100);
        assert_eq!(delivered.token, Some(7));
        assert!(!stream.needs_data());
    }

    #[tokio::test]
    async fn deliver_then_request_matches_immediately() {
        let (stream, mut events, _demand_rx) = stream();

        stream.deliver_payload(sample(1));
        stream.deliver_payload(sample(2));
        assert!(!stream.needs_data());

        stream.request_sample(None).unwrap();
        stream.request_sample(None).unwrap();

        let StreamEvent::Sample(first) = events.recv().await.unwrap() else {
            panic!("expected a sample");
        };
        let StreamEvent::Sample(second) = events.recv().await.unwrap() else {
            panic!("expected a sample");
        };
        assert_eq!(first.time, 1);
        assert_eq!(second.time, 2);
    }

    #[tokio::test]
    async fn end_of_stream_fires_after_drain() {
        let (stream, mut events, mut demand_rx) = stream();

        stream.deliver_payload(sample(1));
        stream.end_of_stream();
        assert!(!stream.needs_data());

        // the queued sample must come out before the end-of-stream
        stream.request_sample(None).unwrap();
        assert!(matches!(events.recv().await.unwrap(), StreamEvent::Sample(_)));
        assert!(matches!(events.recv().await.unwrap(), StreamEvent::EndOfStream));
        assert!(matches!(
            demand_rx.recv().await.unwrap(),
            SourceCommand::EndOfStream {
                stream_id: AUDIO_STREAM_ID
            }
        ));

        // latched: a second notification must not fire another event
        stream.end_of_stream();
        stream.start(0, false);
        assert!(matches!(events.recv().await.unwrap(), StreamEvent::Started { time: 0 }));
    }

    #[test]
    fn request_on_inactive_stream() {
        let (stream, _events, _demand_rx) = stream();
        stream.activate(false);

        let err = stream.request_sample(None).unwrap_err();
        assert!(matches!(err, FlvSourceError::NotAccepting));
    }

    #[test]
    fn request_after_shutdown() {
        let (stream, _events, _demand_rx) = stream();
        stream.shutdown();

        let err = stream.request_sample(None).unwrap_err();
        assert!(matches!(err, FlvSourceError::Shutdown));
    }

    #[tokio::test]
    async fn pause_blocks_demand() {
        let (stream, mut events, _demand_rx) = stream();

        stream.request_sample(None).unwrap();
        assert!(stream.needs_data());

        stream.pause();
        assert!(!stream.needs_data());
        assert!(matches!(events.recv().await.unwrap(), StreamEvent::Paused));

        stream.start(0, false);
        assert!(stream.needs_data());
    }

    #[tokio::test]
    async fn seek_clears_ready_samples() {
        let (stream, mut events, _demand_rx) = stream();

        stream.deliver_payload(sample(1));
        stream.start(50, true);
        assert!(matches!(events.recv().await.unwrap(), StreamEvent::Seeked { time: 50 }));

        // the pre-seek sample is gone; a request goes to the demux loop
        stream.request_sample(None).unwrap();
        assert!(stream.needs_data());
    }

    #[test]
    fn deactivate_clears_queues() {
        let (stream, _events, _demand_rx) = stream();

        stream.request_sample(None).unwrap();
        assert!(stream.activate(false));
        assert!(!stream.activate(true));
        assert!(!stream.needs_data());
    }
}
