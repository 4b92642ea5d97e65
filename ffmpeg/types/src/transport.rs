/*!
    Media transport primitives.
*/

use crate::{Packet, ReadError, SourceConfig, StreamDescriptor, TransportError};

/**
    Opens sources by location.

    Implementations may block on network or filesystem I/O and must not
    retry internally. A transport is shared by every worker, so it must be
    usable from several threads at once.
*/
pub trait Transport: Send + Sync + 'static {
    /**
        Open the source described by `config`.

        On failure nothing stays allocated.
    */
    fn open(&self, config: &SourceConfig) -> Result<Box<dyn Demuxer>, TransportError>;
}

/**
    An opened source.

    A demuxer is owned by exactly one context handle and only ever used by
    one thread at a time.
*/
pub trait Demuxer: Send {
    /**
        Read stream metadata and return the stream table in index order.
    */
    fn probe(&mut self) -> Result<Vec<StreamDescriptor>, TransportError>;

    /**
        Read the next packet.
    */
    fn read(&mut self) -> Result<Packet, ReadError>;

    /**
        Release the native context. Called at most once.
    */
    fn close(&mut self);
}
