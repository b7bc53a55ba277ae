//! Local video file source using FFmpeg.
//!
//! Frames are decoded in-memory, converted to RGB24 and numbered in decode
//! order. The container's average frame rate is reported as-is; a zero rate
//! is rejected later by the record builder.
//!
//! A packet the decoder refuses, or a decoded frame that cannot be converted,
//! is logged and counted as skipped. Only opening the file and flushing the
//! decoder are fatal.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;

use super::{skip_unreadable, FrameSource, SourceStats};
use crate::frame::Frame;

pub(crate) struct VideoFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    fps: f64,
    frame_count: u64,
    frames_read: u64,
    frames_skipped: u64,
    eof_sent: bool,
}

impl VideoFileSource {
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open video file '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let fps = f64::from(input_stream.avg_frame_rate());
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!("video {} opened, {:.3} fps", path, fps);
        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            fps,
            frame_count: 0,
            frames_read: 0,
            frames_skipped: 0,
            eof_sent: false,
        })
    }

    /// Next convertible frame the decoder has ready. Indices follow decode
    /// order, including frames that were skipped.
    fn receive(&mut self) -> Option<Frame> {
        let mut decoded = ffmpeg::frame::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            let index = self.frame_count;
            self.frame_count += 1;
            let converted = self.convert(&decoded, index);
            if let Some(frame) = skip_unreadable(
                converted,
                format_args!("frame {} of {}", index, self.path),
                &mut self.frames_skipped,
            ) {
                self.frames_read += 1;
                return Some(frame);
            }
        }
        None
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video, index: u64) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        Ok(Frame::new(index, width, height, pixels)?)
    }
}

impl FrameSource for VideoFileSource {
    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.receive() {
                return Ok(Some(frame));
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut sent = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                let accepted = skip_unreadable(
                    self.decoder.send_packet(&packet),
                    format_args!("packet at pts {:?} in {}", packet.pts(), self.path),
                    &mut self.frames_skipped,
                );
                if accepted.is_some() {
                    sent = true;
                    break;
                }
            }
            if !sent {
                self.decoder.send_eof().context("flush ffmpeg decoder")?;
                self.eof_sent = true;
            }
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_read: self.frames_read,
            frames_skipped: self.frames_skipped,
            path: self.path.clone(),
        }
    }
}

/// Average frame rate of the best video stream in `path`, without decoding.
pub fn probe_frame_rate(path: &str) -> Result<f64> {
    ffmpeg::init().context("initialize ffmpeg")?;
    let input = ffmpeg::format::input(&path)
        .with_context(|| format!("failed to open video file '{}' with ffmpeg", path))?;
    let stream = input
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or_else(|| anyhow!("file has no video track"))?;
    let fps = f64::from(stream.avg_frame_rate());
    log::info!("inferred fps from video {}: {}", path, fps);
    Ok(fps)
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
