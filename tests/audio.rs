use cambium_dom::{
	audio::{encode_frame, AudioStream, Downsampler, State, TARGET_SAMPLE_RATE},
	channel::Recording,
};
use serde_json::json;

#[test]
fn block_length_is_fixed_by_the_first_block() {
	let mut downsampler = Downsampler::new(48_000);
	assert_eq!(downsampler.block_frames(), None);
	assert_eq!(downsampler.downsample(&[0.0; 4800]).len(), 800);
	assert_eq!(downsampler.block_frames(), Some(800));
	assert_eq!(downsampler.downsample(&[0.0; 100]).len(), 800);
}

#[test]
fn empty_blocks_leave_the_block_length_open() {
	let mut downsampler = Downsampler::new(48_000);
	assert!(downsampler.downsample(&[]).is_empty());
	assert_eq!(downsampler.block_frames(), None);
	assert_eq!(downsampler.downsample(&[0.5; 4800]).len(), 800);
	assert_eq!(downsampler.block_frames(), Some(800));

	let mut stream = AudioStream::new(Recording::new(), 48_000);
	stream.start(0.0).unwrap();
	stream.push_block(&[]).unwrap();
	stream.push_block(&[0.5; 4800]).unwrap();
	let frames: Vec<_> = stream.channel().binary().iter().map(|frame| frame.len()).collect();
	assert_eq!(frames, [2 * 800]);
	assert_eq!(stream.counts(), (1, 0));
}

#[test]
fn samples_are_interpolated() {
	let mut downsampler = Downsampler::new(12_000);
	assert_eq!(downsampler.downsample(&[0.0, 1.0, 0.0, -0.5]), [0, 16384, -16384]);
	// Positions past the end of a short block repeat its last sample.
	assert_eq!(downsampler.downsample(&[0.25, 0.5]), [8192, 16384, 16384]);
}

#[test]
fn samples_saturate() {
	let mut downsampler = Downsampler::new(16_000);
	assert_eq!(downsampler.downsample(&[1.0, 0.0, -1.0, 0.0, 2.0, 0.0]), [i16::MAX, i16::MIN, i16::MAX]);
}

#[test]
fn frames_are_little_endian() {
	assert_eq!(encode_frame(&[1, -2, 0x1234]), [1, 0, 0xFE, 0xFF, 0x34, 0x12]);
}

#[test]
fn session_lifecycle() {
	let mut stream = AudioStream::new(Recording::new(), 16_000);
	stream.push_block(&[0.5; 160]).unwrap();
	assert!(stream.channel().sent.is_empty());

	stream.start(1.5).unwrap();
	stream.handle_message(r#"{"type": "session-confirm", "session_id": "s1"}"#).unwrap();
	assert_eq!(stream.session_id(), Some(&json!("s1")));

	stream.push_block(&[0.5; 160]).unwrap();
	stream.push_block(&[0.5; 160]).unwrap();
	assert_eq!(stream.counts(), (2, 0));
	let frames = stream.channel().binary();
	assert_eq!(frames.len(), 2);
	assert_eq!(frames[0].len(), 2 * 80);

	stream.handle_message(r#"{"type": "confirm-payload", "buf_idx": 1}"#).unwrap();
	stream.stop().unwrap();
	assert_eq!(stream.state(), State::Draining);
	assert_eq!(stream.session_id(), None);
	assert!(!stream.channel().closed);

	stream.push_block(&[0.5; 160]).unwrap();
	assert_eq!(stream.counts(), (2, 1));

	stream.handle_message(r#"{"type": "confirm-payload", "buf_idx": 2}"#).unwrap();
	assert_eq!(stream.state(), State::Closed);
	assert!(stream.channel().closed);
	assert_eq!(stream.counts(), (0, 0));
	assert_eq!(
		stream.channel().json().unwrap(),
		[json!({"type": "session-start", "timestamp": 1.5})]
	);
}

#[test]
fn stopping_when_drained_closes_immediately() {
	let mut stream = AudioStream::new(Recording::new(), 8000);
	stream.start(0.0).unwrap();
	stream.push_block(&[0.0; 80]).unwrap();
	stream.handle_message(r#"{"type": "confirm-payload", "buf_idx": 1}"#).unwrap();
	assert!(!stream.channel().closed);

	stream.stop().unwrap();
	assert_eq!(stream.state(), State::Closed);
	assert!(stream.channel().closed);
}

#[test]
fn block_times() {
	let mut stream = AudioStream::new(Recording::new(), 48_000);
	stream.start(0.0).unwrap();
	stream.push_block(&[0.0; 4800]).unwrap();
	assert_eq!(stream.block_time(0), 0.0);
	assert_eq!(stream.block_time(3), 3.0 * 800.0 / f64::from(TARGET_SAMPLE_RATE));
}
