//! The source state machine and demux loop.
//!
//! [`FlvSource`] is the single owner of the byte stream, the parser, the
//! metadata and the keyframe index. It runs as one task
//! ([`run`](FlvSource::run)) draining a command queue; because every
//! operation and every demux cycle executes on that task, control operations
//! are serialized exactly as if each entry point held one source-wide lock
//! for its critical section. Entry points on [`SourceHandle`] validate
//! against a small shared control state before posting their operation.
//!
//! Demand flows from streams to the source as commands; samples flow from
//! the source to streams through [`FlvStream::deliver_payload`]. The host
//! owns the source event queue and each stream's event queue.

use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use rill_flv::audio::{AudioTagHeader, SoundFormat};
use rill_flv::avcc::AvccRecord;
use rill_flv::keyframes::{Keyframe, KeyframeIndex};
use rill_flv::nal::NaluReader;
use rill_flv::script::{OnMetaData, ScriptData};
use rill_flv::tag::{TagType, PREVIOUS_TAG_SIZE_LEN};
use rill_flv::video::{AvcPacketType, VideoCodecId, VideoTagHeader};
use rill_flv::FlvError;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio::sync::{mpsc, oneshot};

use crate::error::FlvSourceError;
use crate::events::SourceEvent;
use crate::media_type;
use crate::media_type::MediaType;
use crate::parser::{NextTag, TagParser, TagRecord};
use crate::presentation::{PresentationDescription, StreamSelection};
use crate::sample::MediaSample;
use crate::stream::{FlvStream, AUDIO_STREAM_ID, VIDEO_STREAM_ID};

/// Lifecycle state of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Constructed, not yet opened.
    Invalid,
    /// The opening scan is running.
    Opening,
    /// Opened (or stopped); no samples flow.
    Stopped,
    /// Samples flow on demand.
    Started,
    /// Started but suspended.
    Paused,
    /// Terminal. Every further operation fails.
    Shutdown,
}

/// Capability flags of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Characteristics {
    /// The source can pause.
    pub can_pause: bool,
    /// The source can seek.
    pub can_seek: bool,
    /// Seeking may be slow (byte-stream repositioning).
    pub slow_seek: bool,
    /// The source can skip forward.
    pub can_skip_forward: bool,
    /// The source can skip backward.
    pub can_skip_backward: bool,
}

// Status flags of the source, reset on every open.
#[derive(Debug, Default, Clone, Copy)]
struct SourceStatus {
    file_header_ready: bool,
    has_script_data: bool,
    meta_ready: bool,
    on_meta_data_ready: bool,
    first_audio_tag_ready: bool,
    first_video_tag_ready: bool,
    pending_seek: bool,
    pending_request: bool,
    code_private_data_sent: bool,
    scan_once: bool,
}

// Everything the opening scan learns about the file.
#[derive(Debug, Default)]
struct FileInfo {
    meta: OnMetaData,
    has_audio: bool,
    has_video: bool,
    first_media_tag_offset: u64,
    audio: Option<FirstAudioTag>,
    video: Option<FirstVideoTag>,
    avcc: Option<AvccRecord>,
    keyframes: KeyframeIndex,
}

#[derive(Debug)]
struct FirstAudioTag {
    header: AudioTagHeader,
    payload: Bytes,
}

#[derive(Debug)]
struct FirstVideoTag {
    header: VideoTagHeader,
}

/// Operations posted to the source task.
#[derive(Debug)]
pub(crate) enum SourceCommand {
    Open {
        reply: oneshot::Sender<Result<PresentationDescription, FlvSourceError>>,
    },
    Start {
        description: PresentationDescription,
        start_position: Option<i64>,
    },
    Pause,
    Stop,
    RequestData,
    EndOfStream { stream_id: u32 },
    Shutdown,
}

// Control state shared between the handle and the source task.
#[derive(Debug)]
struct Shared {
    state: SourceState,
    processing_op: bool,
    description: Option<PresentationDescription>,
}

fn lock_shared(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The host-facing entry surface of the source.
///
/// Cloneable; every method validates the current state and posts the
/// operation to the source task. At most one control operation is in flight
/// at a time: a second one fails with
/// [`NotAccepting`](FlvSourceError::NotAccepting) until the first completes.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    shared: Arc<Mutex<Shared>>,
    commands: mpsc::UnboundedSender<SourceCommand>,
}

impl SourceHandle {
    /// Opens the source: scans the file until the presentation can be
    /// described and publishes the presentation description.
    ///
    /// Valid once, from the initial state. A failed open is terminal: the
    /// source transitions to [`SourceState::Shutdown`].
    pub async fn open(&self) -> Result<PresentationDescription, FlvSourceError> {
        {
            let mut shared = lock_shared(&self.shared);
            match shared.state {
                SourceState::Shutdown => return Err(FlvSourceError::Shutdown),
                SourceState::Invalid => {}
                _ => return Err(FlvSourceError::InvalidStateTransition),
            }
            shared.state = SourceState::Opening;
        }

        let (reply, result) = oneshot::channel();
        self.commands
            .send(SourceCommand::Open { reply })
            .map_err(|_| FlvSourceError::Shutdown)?;

        result.await.map_err(|_| FlvSourceError::Shutdown)?
    }

    /// Starts playback, seeks, or resumes.
    ///
    /// `start_position` is a presentation time in 100-nanosecond units;
    /// `None` starts from the beginning (from stopped) or resumes at the
    /// current keyframe (from started or paused). The description's
    /// selection bits decide which streams produce samples.
    pub fn start(
        &self,
        description: &PresentationDescription,
        start_position: Option<i64>,
    ) -> Result<(), FlvSourceError> {
        let mut shared = lock_shared(&self.shared);
        self.check_initialized(&shared)?;

        let Some(own) = &shared.description else {
            return Err(FlvSourceError::NotInitialized);
        };
        if description
            .streams
            .iter()
            .any(|stream| own.stream(stream.stream_id).is_none())
        {
            return Err(FlvSourceError::InvalidArgument(
                "presentation description names an unknown stream",
            ));
        }
        if !description.streams.iter().any(|stream| stream.selected) {
            return Err(FlvSourceError::InvalidArgument("no stream selected"));
        }

        self.begin_op(&mut shared)?;
        drop(shared);

        self.commands
            .send(SourceCommand::Start {
                description: description.clone(),
                start_position,
            })
            .map_err(|_| FlvSourceError::Shutdown)
    }

    /// Pauses the source. Valid only while started.
    pub fn pause(&self) -> Result<(), FlvSourceError> {
        let mut shared = lock_shared(&self.shared);
        self.check_initialized(&shared)?;

        if shared.state != SourceState::Started {
            return Err(FlvSourceError::InvalidStateTransition);
        }

        self.begin_op(&mut shared)?;
        drop(shared);

        self.commands.send(SourceCommand::Pause).map_err(|_| FlvSourceError::Shutdown)
    }

    /// Stops the source. Queued samples and requests are discarded.
    pub fn stop(&self) -> Result<(), FlvSourceError> {
        let mut shared = lock_shared(&self.shared);
        self.check_initialized(&shared)?;

        self.begin_op(&mut shared)?;
        drop(shared);

        self.commands.send(SourceCommand::Stop).map_err(|_| FlvSourceError::Shutdown)
    }

    /// Shuts the source down. Terminal; every later operation fails with
    /// [`Shutdown`](FlvSourceError::Shutdown).
    pub fn shutdown(&self) -> Result<(), FlvSourceError> {
        let mut shared = lock_shared(&self.shared);
        if shared.state == SourceState::Shutdown {
            return Err(FlvSourceError::Shutdown);
        }

        shared.state = SourceState::Shutdown;
        shared.description = None;
        drop(shared);

        let _ = self.commands.send(SourceCommand::Shutdown);
        Ok(())
    }

    /// The source's capability flags.
    pub fn characteristics(&self) -> Result<Characteristics, FlvSourceError> {
        if lock_shared(&self.shared).state == SourceState::Shutdown {
            return Err(FlvSourceError::Shutdown);
        }

        Ok(Characteristics {
            can_pause: true,
            can_seek: true,
            slow_seek: true,
            can_skip_forward: true,
            can_skip_backward: true,
        })
    }

    /// The current presentation description.
    pub fn presentation_description(&self) -> Result<PresentationDescription, FlvSourceError> {
        let shared = lock_shared(&self.shared);
        if shared.state == SourceState::Shutdown {
            return Err(FlvSourceError::Shutdown);
        }

        shared.description.clone().ok_or(FlvSourceError::NotInitialized)
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SourceState {
        lock_shared(&self.shared).state
    }

    fn check_initialized(&self, shared: &Shared) -> Result<(), FlvSourceError> {
        match shared.state {
            SourceState::Shutdown => Err(FlvSourceError::Shutdown),
            SourceState::Invalid | SourceState::Opening => Err(FlvSourceError::NotInitialized),
            _ => Ok(()),
        }
    }

    fn begin_op(&self, shared: &mut Shared) -> Result<(), FlvSourceError> {
        if shared.processing_op {
            return Err(FlvSourceError::NotAccepting);
        }
        shared.processing_op = true;
        Ok(())
    }
}

/// The pull-model FLV media source.
///
/// Construct with [`new`](FlvSource::new), spawn [`run`](FlvSource::run) on
/// the executor, then drive it through the returned [`SourceHandle`]. Events
/// arrive on the returned receiver; per-stream events arrive on each
/// stream's own queue.
pub struct FlvSource<S> {
    parser: TagParser<S>,
    shared: Arc<Mutex<Shared>>,
    commands: mpsc::UnboundedReceiver<SourceCommand>,
    demand: mpsc::UnboundedSender<SourceCommand>,
    events: mpsc::UnboundedSender<SourceEvent>,
    status: SourceStatus,
    info: FileInfo,
    video_stream: Option<FlvStream>,
    audio_stream: Option<FlvStream>,
    pending_seek_file_position: u64,
    pending_eos: u32,
    restart_counter: u32,
    current_keyframe: Keyframe,
}

impl<S: AsyncRead + AsyncSeek + Unpin + Send> FlvSource<S> {
    /// Creates a source over a readable, seekable byte stream.
    ///
    /// Returns the source itself (to be spawned via [`run`](FlvSource::run)),
    /// the control handle, and the source event receiver.
    pub fn new(io: S) -> (Self, SourceHandle, mpsc::UnboundedReceiver<SourceEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(Shared {
            state: SourceState::Invalid,
            processing_op: false,
            description: None,
        }));

        let source = FlvSource {
            parser: TagParser::new(io),
            shared: shared.clone(),
            commands: command_rx,
            demand: command_tx.clone(),
            events: event_tx,
            status: SourceStatus::default(),
            info: FileInfo::default(),
            video_stream: None,
            audio_stream: None,
            pending_seek_file_position: 0,
            pending_eos: 0,
            restart_counter: 0,
            current_keyframe: Keyframe { position: 0, time: 0 },
        };
        let handle = SourceHandle {
            shared,
            commands: command_tx,
        };

        (source, handle, event_rx)
    }

    /// Runs the source until it is shut down.
    ///
    /// Commands drain before demuxing; while any stream reports demand, one
    /// tag is read and one sample delivered per iteration.
    pub async fn run(mut self) {
        loop {
            let command = if self.needs_demux() {
                match self.commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(mpsc::error::TryRecvError::Empty) => None,
                    Err(mpsc::error::TryRecvError::Disconnected) => break,
                }
            } else {
                match self.commands.recv().await {
                    Some(command) => Some(command),
                    None => break,
                }
            };

            match command {
                Some(command) => {
                    if self.process(command).await {
                        break;
                    }
                }
                None => self.demux_once().await,
            }
        }
    }

    // Returns true when the source is done for good.
    async fn process(&mut self, command: SourceCommand) -> bool {
        match command {
            SourceCommand::Open { reply } => {
                let result = self.do_open().await;
                if result.is_err() {
                    // the source is not designed to recover from a failed open
                    self.do_shutdown();
                    let _ = reply.send(result);
                    return true;
                }
                let _ = reply.send(result);
            }
            SourceCommand::Start {
                description,
                start_position,
            } => self.do_start(&description, start_position),
            SourceCommand::Pause => self.do_pause(),
            SourceCommand::Stop => self.do_stop(),
            SourceCommand::RequestData => {}
            SourceCommand::EndOfStream { stream_id } => self.do_end_of_stream(stream_id),
            SourceCommand::Shutdown => {
                self.do_shutdown();
                return true;
            }
        }

        false
    }

    // --- opening scan ---

    async fn do_open(&mut self) -> Result<PresentationDescription, FlvSourceError> {
        if self.parser.position().await.is_err() {
            return Err(FlvSourceError::ByteStreamNotSeekable);
        }

        self.status = SourceStatus::default();
        self.info = FileInfo::default();

        let header = self.parser.read_file_header().await?;
        self.status.file_header_ready = true;
        self.info.has_audio = header.has_audio;
        self.info.has_video = header.has_video;
        tracing::debug!(
            version = header.version,
            has_audio = header.has_audio,
            has_video = header.has_video,
            "read file header"
        );

        while !self.scan_complete() {
            let record = match self.parser.read_tag_header(true).await? {
                NextTag::Tag(record) => record,
                NextTag::Eof => {
                    // one full pass without resolving every stream
                    self.status.scan_once = true;
                    break;
                }
            };

            match record.header.tag_type {
                TagType::ScriptData if !self.status.on_meta_data_ready => {
                    self.status.has_script_data = true;
                    self.scan_script_tag(&record).await?;
                }
                TagType::Audio => {
                    self.info.has_audio = true;
                    if self.info.first_media_tag_offset == 0 {
                        self.info.first_media_tag_offset = record.tag_start();
                    }
                    if self.status.first_audio_tag_ready {
                        self.parser.seek_forward(record.header.data_size).await?;
                    } else {
                        self.scan_first_audio_tag(&record).await?;
                    }
                }
                TagType::Video => {
                    self.info.has_video = true;
                    if self.info.first_media_tag_offset == 0 {
                        self.info.first_media_tag_offset = record.tag_start();
                    }
                    if self.status.first_video_tag_ready {
                        self.parser.seek_forward(record.header.data_size).await?;
                    } else {
                        self.scan_first_video_tag(&record).await?;
                    }
                }
                _ => self.parser.seek_forward(record.header.data_size).await?,
            }
        }

        if self.status.scan_once {
            return Err(FlvSourceError::InvalidFormat(FlvError::UnexpectedEndOfFile));
        }

        self.finish_initialize()
    }

    async fn scan_script_tag(&mut self, record: &TagRecord) -> Result<(), FlvSourceError> {
        match self.parser.read_script_data(record.header.data_size as usize).await? {
            ScriptData::OnMetaData(meta) => {
                self.status.on_meta_data_ready = true;
                self.status.meta_ready = true;
                if let Some(keyframes) = &meta.keyframes {
                    self.info.keyframes = KeyframeIndex::from_meta(keyframes)?;
                }
                tracing::debug!(
                    duration = ?meta.duration,
                    videocodecid = ?meta.videocodecid,
                    audiocodecid = ?meta.audiocodecid,
                    "read onMetaData"
                );
                self.info.meta = *meta;
            }
            ScriptData::Other { name } => {
                tracing::trace!(name = %name, "skipping script tag");
            }
        }

        Ok(())
    }

    async fn scan_first_audio_tag(&mut self, record: &TagRecord) -> Result<(), FlvSourceError> {
        let header = self.parser.read_audio_header().await?;
        let mut consumed = 1;
        if header.sound_format == SoundFormat::Aac {
            self.parser.read_aac_packet_type().await?;
            consumed += 1;
        }

        let payload = self.parser.read_payload(record.payload_size(consumed)?).await?;
        self.info.audio = Some(FirstAudioTag { header, payload });
        self.status.first_audio_tag_ready = true;

        Ok(())
    }

    async fn scan_first_video_tag(&mut self, record: &TagRecord) -> Result<(), FlvSourceError> {
        let header = self.parser.read_video_header().await?;
        let mut consumed = 1;
        if header.codec_id == VideoCodecId::Avc {
            self.parser.read_avc_packet_header().await?;
            consumed += 4;
        }

        let payload = self.parser.read_payload(record.payload_size(consumed)?).await?;
        if header.codec_id == VideoCodecId::Avc {
            self.info.avcc = Some(AvccRecord::parse(&mut Cursor::new(payload))?);
        }

        self.info.video = Some(FirstVideoTag { header });
        self.status.first_video_tag_ready = true;

        Ok(())
    }

    // The scan is done when each claimed stream either delivered its first
    // tag or is known (from the metadata) to carry a codec that needs no
    // per-stream header scan.
    fn scan_complete(&self) -> bool {
        if !self.status.file_header_ready {
            return false;
        }

        let audio_ready = !self.info.has_audio
            || self.status.first_audio_tag_ready
            || (self.status.meta_ready
                && self
                    .info
                    .meta
                    .audiocodecid
                    .is_some_and(|codec| codec != SoundFormat::Aac));
        let video_ready = !self.info.has_video
            || self.status.first_video_tag_ready
            || (self.status.meta_ready
                && self
                    .info
                    .meta
                    .videocodecid
                    .is_some_and(|codec| codec != VideoCodecId::Avc));

        audio_ready && video_ready
    }

    fn finish_initialize(&mut self) -> Result<PresentationDescription, FlvSourceError> {
        let mut streams = Vec::new();

        if self.info.has_video {
            let codec = self
                .info
                .video
                .as_ref()
                .map(|video| video.header.codec_id)
                .or(self.info.meta.videocodecid)
                .unwrap_or(VideoCodecId::Avc);
            let media_type = MediaType::Video(media_type::video_media_type(
                codec,
                &self.info.meta,
                self.info.avcc.as_ref(),
            )?);
            let stream = FlvStream::new(VIDEO_STREAM_ID, media_type.clone(), self.demand.clone());
            streams.push(StreamSelection {
                stream_id: VIDEO_STREAM_ID,
                media_type,
                selected: true,
            });
            self.video_stream = Some(stream);
        }

        if self.info.has_audio {
            let codec = self
                .info
                .audio
                .as_ref()
                .map(|audio| audio.header.sound_format)
                .or(self.info.meta.audiocodecid)
                .unwrap_or(SoundFormat::Aac);
            let user_data = self.info.audio.as_ref().map(|audio| audio.payload.clone()).unwrap_or_default();
            let media_type = MediaType::Audio(media_type::audio_media_type(
                codec,
                &self.info.meta,
                self.info.audio.as_ref().map(|audio| &audio.header),
                user_data,
            )?);
            let stream = FlvStream::new(AUDIO_STREAM_ID, media_type.clone(), self.demand.clone());
            streams.push(StreamSelection {
                stream_id: AUDIO_STREAM_ID,
                media_type,
                selected: true,
            });
            self.audio_stream = Some(stream);
        }

        let meta = &self.info.meta;
        let description = PresentationDescription {
            duration: (meta.duration.unwrap_or(0.0) * 10_000_000.0) as i64,
            audio_bitrate: meta.audiodatarate.unwrap_or(0.0) as u32,
            video_bitrate: meta.videodatarate.unwrap_or(0.0) as u32,
            file_size: meta.filesize.unwrap_or(0.0) as u64,
            streams,
        };

        {
            let mut shared = lock_shared(&self.shared);
            shared.state = SourceState::Stopped;
            shared.description = Some(description.clone());
        }

        tracing::debug!(
            streams = description.streams.len(),
            has_script_data = self.status.has_script_data,
            "presentation description ready"
        );
        Ok(description)
    }

    // --- control operations ---

    fn do_start(&mut self, description: &PresentationDescription, start_position: Option<i64>) {
        let state = self.state();
        let mut is_seek = false;

        let keyframe = match start_position {
            Some(time) => {
                let keyframe = self.info.keyframes.seek(time).unwrap_or(Keyframe {
                    position: self.info.first_media_tag_offset,
                    time: 0,
                });
                self.pending_seek_file_position = keyframe.position.saturating_sub(PREVIOUS_TAG_SIZE_LEN);
                self.status.pending_seek = true;
                if state != SourceState::Stopped {
                    is_seek = true;
                }
                keyframe
            }
            None if state == SourceState::Stopped => {
                let keyframe = Keyframe {
                    position: self.info.first_media_tag_offset,
                    time: 0,
                };
                self.pending_seek_file_position = keyframe.position.saturating_sub(PREVIOUS_TAG_SIZE_LEN);
                self.status.pending_seek = true;
                keyframe
            }
            // resume where the demux loop is, without repositioning
            None => self.current_keyframe,
        };

        self.select_streams(description);

        // the state change and operation completion must be observable
        // before the events that announce them
        self.set_state(SourceState::Started);
        self.finish_op();

        if is_seek {
            tracing::debug!(time = keyframe.time, "source seeked");
            self.send_event(SourceEvent::Seeked { time: keyframe.time });
        } else {
            tracing::debug!(time = keyframe.time, "source started");
            self.send_event(SourceEvent::Started {
                time: keyframe.time,
                actual_start: keyframe.time,
            });
        }

        if let Some(stream) = &self.video_stream {
            stream.start(keyframe.time, is_seek);
        }
        if let Some(stream) = &self.audio_stream {
            stream.start(keyframe.time, is_seek);
        }
    }

    fn select_streams(&mut self, description: &PresentationDescription) {
        self.pending_eos = 0;

        for selection in &description.streams {
            let stream = match selection.stream_id {
                VIDEO_STREAM_ID => self.video_stream.clone(),
                AUDIO_STREAM_ID => self.audio_stream.clone(),
                _ => None,
            };
            let Some(stream) = stream else { continue };

            let was_active = stream.activate(selection.selected);
            if selection.selected {
                self.pending_eos += 1;
                let event = if was_active {
                    SourceEvent::UpdatedStream(stream)
                } else {
                    SourceEvent::NewStream(stream)
                };
                self.send_event(event);
            }
        }
    }

    fn do_pause(&mut self) {
        if self.state() != SourceState::Started {
            self.finish_op();
            self.send_event(SourceEvent::Error(FlvSourceError::InvalidStateTransition));
            return;
        }

        if let Some(stream) = &self.video_stream {
            stream.pause();
        }
        if let Some(stream) = &self.audio_stream {
            stream.pause();
        }

        self.set_state(SourceState::Paused);
        self.finish_op();
        tracing::debug!("source paused");
        self.send_event(SourceEvent::Paused);
    }

    fn do_stop(&mut self) {
        if let Some(stream) = &self.video_stream {
            stream.stop();
        }
        if let Some(stream) = &self.audio_stream {
            stream.stop();
        }

        // in-flight demux completions compare against this and are dropped
        self.restart_counter = self.restart_counter.wrapping_add(1);
        self.status.pending_request = false;

        self.set_state(SourceState::Stopped);
        self.finish_op();
        tracing::debug!("source stopped");
        self.send_event(SourceEvent::Stopped);
    }

    fn do_end_of_stream(&mut self, stream_id: u32) {
        tracing::debug!(stream_id, "stream drained");

        if self.pending_eos == 0 {
            return;
        }

        self.pending_eos -= 1;
        if self.pending_eos == 0 {
            tracing::debug!("end of presentation");
            self.send_event(SourceEvent::EndOfPresentation);
        }
    }

    fn do_shutdown(&mut self) {
        if let Some(stream) = self.video_stream.take() {
            stream.shutdown();
        }
        if let Some(stream) = self.audio_stream.take() {
            stream.shutdown();
        }

        {
            let mut shared = lock_shared(&self.shared);
            shared.state = SourceState::Shutdown;
            shared.description = None;
        }

        tracing::debug!("source shut down");
    }

    // --- demux loop ---

    fn needs_demux(&self) -> bool {
        if self.state() == SourceState::Shutdown {
            return false;
        }
        if self.status.pending_request {
            return false;
        }

        self.video_stream.as_ref().is_some_and(|stream| stream.needs_data())
            || self.audio_stream.as_ref().is_some_and(|stream| stream.needs_data())
    }

    async fn demux_once(&mut self) {
        let epoch = self.restart_counter;
        if let Err(error) = self.demux_cycle(epoch).await {
            self.status.pending_request = false;
            tracing::error!(error = %error, "streaming error");
            self.send_event(SourceEvent::Error(error));
        }
    }

    // One cycle: read one tag, build one sample, deliver it.
    async fn demux_cycle(&mut self, epoch: u32) -> Result<(), FlvSourceError> {
        if self.status.pending_seek {
            self.status.pending_seek = false;
            self.status.code_private_data_sent = false;
            self.parser.set_position(self.pending_seek_file_position).await?;
            tracing::debug!(position = self.pending_seek_file_position, "repositioned byte stream");
        }

        self.status.pending_request = true;

        let record = match self.parser.read_tag_header(true).await? {
            NextTag::Tag(record) => record,
            NextTag::Eof => {
                self.status.pending_request = false;
                self.end_of_file();
                return Ok(());
            }
        };

        match record.header.tag_type {
            TagType::Audio => self.demux_audio_tag(&record, epoch).await?,
            TagType::Video => self.demux_video_tag(&record, epoch).await?,
            // script and unknown tags are skipped
            _ => self.parser.seek_forward(record.header.data_size).await?,
        }

        self.status.pending_request = false;
        Ok(())
    }

    async fn demux_audio_tag(&mut self, record: &TagRecord, epoch: u32) -> Result<(), FlvSourceError> {
        let header = self.parser.read_audio_header().await?;
        let mut consumed = 1;
        if header.sound_format == SoundFormat::Aac {
            self.parser.read_aac_packet_type().await?;
            consumed += 1;
        }

        let payload = self.parser.read_payload(record.payload_size(consumed)?).await?;

        if self.restart_counter != epoch {
            return Ok(());
        }

        let sample = MediaSample {
            buffers: vec![payload],
            time: record.header.timestamp_ms as i64 * 10_000,
            key_frame: false,
            token: None,
        };

        if let Some(stream) = &self.audio_stream {
            stream.deliver_payload(sample);
        }

        Ok(())
    }

    async fn demux_video_tag(&mut self, record: &TagRecord, epoch: u32) -> Result<(), FlvSourceError> {
        let header = self.parser.read_video_header().await?;
        let mut consumed = 1;
        let mut packet = None;
        if header.codec_id == VideoCodecId::Avc {
            packet = Some(self.parser.read_avc_packet_header().await?);
            consumed += 4;
        }

        let payload = self.parser.read_payload(record.payload_size(consumed)?).await?;

        if self.restart_counter != epoch {
            return Ok(());
        }

        let composition_time = packet.map(|packet| packet.composition_time).unwrap_or(0);
        let time = (record.header.timestamp_ms as i64 + composition_time as i64) * 10_000;
        let key_frame = header.frame_type.is_key_frame();

        if key_frame {
            self.current_keyframe = Keyframe {
                position: record.tag_start(),
                time,
            };
        }

        let buffers = match packet {
            Some(packet) if packet.packet_type == AvcPacketType::SequenceHeader => {
                self.info.avcc = Some(AvccRecord::parse(&mut Cursor::new(payload))?);
                tracing::debug!("refreshed avc decoder configuration");
                return Ok(());
            }
            Some(packet) if packet.packet_type == AvcPacketType::Nalu => {
                let avcc = self.info.avcc.as_ref().ok_or(FlvError::NaluBeforeSequenceHeader)?;

                let mut buffers = Vec::new();
                if !self.status.code_private_data_sent {
                    self.status.code_private_data_sent = true;
                    buffers.push(avcc.sequence_header.clone());
                }

                let mut nalus = NaluReader::new(payload, avcc.nal_length_size);
                while let Some(nalu) = nalus.next_nalu()? {
                    buffers.push(nalu);
                }
                buffers
            }
            // end-of-sequence and unknown AVC packets carry nothing to decode
            Some(_) => return Ok(()),
            None => vec![payload],
        };

        let sample = MediaSample {
            buffers,
            time,
            key_frame,
            token: None,
        };

        if let Some(stream) = &self.video_stream {
            stream.deliver_payload(sample);
        }

        Ok(())
    }

    fn end_of_file(&mut self) {
        tracing::debug!("end of file");

        if let Some(stream) = &self.video_stream {
            stream.end_of_stream();
        }
        if let Some(stream) = &self.audio_stream {
            stream.end_of_stream();
        }
    }

    // --- helpers ---

    fn state(&self) -> SourceState {
        lock_shared(&self.shared).state
    }

    fn set_state(&self, state: SourceState) {
        lock_shared(&self.shared).state = state;
    }

    fn finish_op(&self) {
        lock_shared(&self.shared).processing_op = false;
    }

    fn send_event(&self, event: SourceEvent) {
        let _ = self.events.send(event);
    }
}
