/// Dataset-scoped counter for image and annotation ids.
///
/// One sequence is owned by one emitter; both counters start at zero and
/// only move forward, so ids are unique within the file they end up in.
#[derive(Debug, Clone, Default)]
pub struct IdSequence {
    next_image: u64,
    next_annotation: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_image_id(&mut self) -> u64 {
        let id = self.next_image;
        self.next_image += 1;
        id
    }

    pub fn next_annotation_id(&mut self) -> u64 {
        let id = self.next_annotation;
        self.next_annotation += 1;
        id
    }
}
