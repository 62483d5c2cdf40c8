use std::io::{self, Read, Write};

/// Wraps a stream with separate, resettable read/write ceilings, grounded on
/// cxxtools `BasicLimitStreambuf` (`include/cxxtools/limitstream.h`): once
/// `icount`/`ocount` bytes have passed through, further reads/writes report
/// EOF until the counter is reset.
pub struct LimitStream<S> {
    inner: S,
    icount: usize,
    ocount: usize,
}

impl<S> LimitStream<S> {
    pub fn new(inner: S, icount: usize, ocount: usize) -> Self {
        LimitStream { inner, icount, ocount }
    }

    pub fn icount(&self) -> usize {
        self.icount
    }

    pub fn set_icount(&mut self, icount: usize) {
        self.icount = icount;
    }

    pub fn ocount(&self) -> usize {
        self.ocount
    }

    pub fn set_ocount(&mut self, ocount: usize) {
        self.ocount = ocount;
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read> Read for LimitStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.icount == 0 {
            return Ok(0);
        }
        let cap = self.icount.min(buf.len());
        let n = self.inner.read(&mut buf[..cap])?;
        self.icount -= n;
        Ok(n)
    }
}

impl<S: Write> Write for LimitStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.ocount == 0 {
            return Ok(0);
        }
        let cap = self.ocount.min(buf.len());
        let n = self.inner.write(&buf[..cap])?;
        self.ocount -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read as _};

    #[test]
    fn read_caps_then_resumes_after_icount_reset() {
        let mut limited = LimitStream::new(Cursor::new(b"foobar".to_vec()), 3, 0);
        let mut s = String::new();
        limited.read_to_string(&mut s).unwrap();
        assert_eq!(s, "foo");
        assert_eq!(limited.icount(), 0);

        limited.set_icount(5);
        let mut s = String::new();
        limited.read_to_string(&mut s).unwrap();
        assert_eq!(s, "bar");
        assert_eq!(limited.icount(), 2);
    }

    #[test]
    fn write_caps_then_resumes_after_ocount_reset() {
        let mut limited = LimitStream::new(Vec::new(), 0, 3);
        limited.write_all(b"fo").unwrap();
        let n = limited.write(b"obar").unwrap();
        assert_eq!(n, 1);
        assert_eq!(limited.ocount(), 0);
        assert_eq!(limited.clone_inner(), b"foo");

        limited.set_ocount(5);
        limited.write_all(b"bar").unwrap();
        assert_eq!(limited.clone_inner(), b"foobar");
        assert_eq!(limited.ocount(), 2);
    }

    impl LimitStream<Vec<u8>> {
        fn clone_inner(&self) -> Vec<u8> {
            self.inner.clone()
        }
    }
}
