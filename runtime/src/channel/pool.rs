use std::{
    ops::Deref,
    sync::Arc,
};

use bytes::BytesMut;
use parking_lot::Mutex;

struct Slots {
    free:     Mutex<Vec<BytesMut>>,
    max_free: usize,
}

/// Free list of datagram buffers for one channel.
///
/// A buffer returns to the list only when its [`PooledDatagram`] is dropped, so nothing is
/// reused while still queued or being processed.
#[derive(Clone)]
pub struct DatagramPool(Arc<Slots>);

impl DatagramPool {
    pub fn new(slots: usize) -> Self {
        Self(Arc::new(Slots {
            free:     Mutex::new(Vec::with_capacity(slots)),
            max_free: slots,
        }))
    }

    /// Copies `datagram` into a free buffer, allocating one if none is available.
    pub fn fill(&self, datagram: &[u8]) -> PooledDatagram {
        let mut buf = self.0.free.lock().pop().unwrap_or_default();

        buf.clear();
        buf.extend_from_slice(datagram);

        PooledDatagram {
            buf,
            pool: self.0.clone(),
        }
    }

    pub fn available(&self) -> usize {
        self.0.free.lock().len()
    }
}

pub struct PooledDatagram {
    buf:  BytesMut,
    pool: Arc<Slots>,
}

impl Deref for PooledDatagram {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for PooledDatagram {
    fn drop(&mut self) {
        let mut free = self.pool.free.lock();

        if free.len() < self.pool.max_free {
            free.push(std::mem::take(&mut self.buf));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reuses_returned_buffers() {
        let pool = DatagramPool::new(2);
        assert_eq!(pool.available(), 0);

        let a = pool.fill(b"first");
        let b = pool.fill(b"second");
        let c = pool.fill(b"third");

        assert_eq!(&*a, b"first");
        assert_eq!(&*c, b"third");

        drop(a);
        drop(b);
        drop(c);
        assert_eq!(pool.available(), 2);

        let d = pool.fill(b"x");
        assert_eq!(&*d, b"x");
        assert_eq!(pool.available(), 1);
    }
}
