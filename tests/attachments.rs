use cambium_dom::{
	attachments::{MemoryFile, UploadQueue, Uploaded, DEFAULT_CHUNK_SIZE},
	channel::{Channel, Recording},
	ProtocolError,
};
use serde_json::json;
use std::{cell::RefCell, rc::Rc};

/// Fails the first `failures` text messages.
#[derive(Debug, Default)]
struct Flaky {
	failures: usize,
	text: Vec<String>,
}
impl Channel for Flaky {
	type Error = &'static str;

	fn send_text(&mut self, text: &str) -> Result<(), Self::Error> {
		if self.failures > 0 {
			self.failures -= 1;
			return Err("connection reset");
		}
		self.text.push(text.to_owned());
		Ok(())
	}

	fn send_binary(&mut self, _: &[u8]) -> Result<(), Self::Error> {
		Ok(())
	}

	fn close(&mut self) -> Result<(), Self::Error> {
		Ok(())
	}
}

#[test]
fn chunks_follow_acknowledgements() {
	let progress = Rc::new(RefCell::new(Vec::new()));
	let finished = Rc::new(RefCell::new(Vec::new()));

	let mut queue = UploadQueue::with_chunk_size(Recording::new(), 4);
	queue
		.put_file(
			MemoryFile::new("notes.txt", b"0123456789".to_vec()),
			Some(Box::new({
				let finished = Rc::clone(&finished);
				move |uploaded: &Uploaded, file: &MemoryFile| finished.borrow_mut().push((uploaded.clone(), file.name.clone()))
			})),
			Some(Box::new({
				let progress = Rc::clone(&progress);
				move |received: u64, _: &MemoryFile| progress.borrow_mut().push(received)
			})),
		)
		.unwrap();

	assert_eq!(
		queue.channel().json().unwrap(),
		[json!({"type": "start-upload", "filename": "notes.txt", "size": 10})]
	);
	assert_eq!(queue.channel().binary(), [&b"0123"[..]]);

	queue.handle_message(r#"{"type": "upload-started", "id": 7}"#).unwrap();
	queue.handle_message(r#"{"type": "got-chunk", "id": 7, "size": 4}"#).unwrap();
	queue.handle_message(r#"{"type": "got-chunk", "id": 7, "size": 8}"#).unwrap();
	assert_eq!(queue.channel().binary(), [&b"0123"[..], &b"4567"[..], &b"89"[..]]);
	assert_eq!(queue.current().map(|(_, sent)| sent), Some(10));

	queue.handle_message(r#"{"type": "got-chunk", "id": 7, "size": 10}"#).unwrap();
	// Nothing left to send.
	assert_eq!(queue.channel().binary().len(), 3);
	assert_eq!(*progress.borrow(), [4, 8, 10]);

	queue
		.handle_message(r#"{"type": "upload-finished", "id": 7, "path": "/files/notes.txt"}"#)
		.unwrap();
	assert!(queue.is_idle());
	assert_eq!(
		*finished.borrow(),
		[(
			Uploaded {
				id: Some(json!(7)),
				path: Some("/files/notes.txt".to_owned()),
			},
			"notes.txt".to_owned()
		)]
	);
}

#[test]
fn files_are_uploaded_one_at_a_time() {
	let mut queue = UploadQueue::with_chunk_size(Recording::new(), 8);
	queue.put_file(MemoryFile::new("a", b"aa".to_vec()), None, None).unwrap();
	queue.put_file(MemoryFile::new("b", b"bbb".to_vec()), None, None).unwrap();
	assert_eq!(queue.queued(), 1);
	assert_eq!(queue.channel().json().unwrap().len(), 1);

	queue.handle_message(r#"{"type": "upload-started", "id": "a"}"#).unwrap();
	queue.handle_message(r#"{"type": "got-chunk", "size": 2}"#).unwrap();
	queue.handle_message(r#"{"type": "upload-finished", "path": "/a"}"#).unwrap();

	assert_eq!(queue.queued(), 0);
	assert_eq!(queue.current().map(|(file, _)| file.name.as_str()), Some("b"));
	assert_eq!(
		queue.channel().json().unwrap(),
		[
			json!({"type": "start-upload", "filename": "a", "size": 2}),
			json!({"type": "start-upload", "filename": "b", "size": 3}),
		]
	);
	assert_eq!(queue.channel().binary(), [&b"aa"[..], &b"bbb"[..]]);
}

#[test]
fn empty_files_send_one_empty_chunk() {
	let mut queue = UploadQueue::new(Recording::new());
	assert_eq!(queue.chunk_size(), DEFAULT_CHUNK_SIZE);
	queue.put_file(MemoryFile::new("empty", Vec::new()), None, None).unwrap();
	assert_eq!(queue.channel().binary(), [&b""[..]]);
}

#[test]
fn large_files_use_the_default_chunk_size() {
	let mut queue = UploadQueue::new(Recording::new());
	queue.put_file(MemoryFile::new("big", vec![1; DEFAULT_CHUNK_SIZE + 1]), None, None).unwrap();
	queue.handle_message(r#"{"type": "got-chunk"}"#).unwrap();

	let chunks: Vec<_> = queue.channel().binary().iter().map(|chunk| chunk.len()).collect();
	assert_eq!(chunks, [DEFAULT_CHUNK_SIZE, 1]);
}

#[test]
fn messages_without_upload_are_unexpected() {
	let mut queue = UploadQueue::<_, MemoryFile>::new(Recording::new());
	assert!(matches!(
		queue.handle_message(r#"{"type": "got-chunk", "size": 1}"#),
		Err(ProtocolError::Unexpected { .. })
	));
	assert!(matches!(
		queue.handle_message(r#"{"type": "upload-finished"}"#),
		Err(ProtocolError::Unexpected { .. })
	));
	queue.handle_message(r#"{"type": "something-else"}"#).unwrap();
	assert!(queue.channel().sent.is_empty());
}

#[test]
fn failed_starts_keep_the_file_queued() {
	let mut queue = UploadQueue::new(Flaky { failures: 1, text: Vec::new() });
	assert!(matches!(
		queue.put_file(MemoryFile::new("a", b"aa".to_vec()), None, None),
		Err(ProtocolError::Channel(_))
	));
	assert!(queue.is_idle());
	assert_eq!(queue.queued(), 1);

	queue.put_file(MemoryFile::new("b", b"b".to_vec()), None, None).unwrap();
	assert_eq!(queue.current().map(|(file, _)| file.name.as_str()), Some("a"));
	assert_eq!(queue.queued(), 1);
	assert_eq!(queue.channel().text.len(), 1);
	assert!(queue.channel().text[0].contains(r#""filename":"a""#));
}
