#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid disk geometry")]
    GeometryInvalid,
    #[error("memory exhausted")]
    OutOfMemory,
    #[error("could not open `{path}`")]
    IoOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error while reading")]
    IoRead(#[source] std::io::Error),
    #[error("error while writing")]
    IoWrite(#[source] std::io::Error),
    #[error("premature end of data")]
    PrematureEnd,
    #[error("extra data at end of disk image")]
    TrailingGarbage,
    #[error("invalid real address {rda:#06x}")]
    InvalidRda { rda: u16 },
    #[error("invalid virtual address {vda}")]
    InvalidVda { vda: u16 },
    #[error("invalid page header at VDA = {vda}")]
    HeaderMismatch { vda: u16 },
    #[error("invalid label at VDA = {vda}")]
    LabelInvalid { vda: u16 },
    #[error("broken link at VDA = {vda}")]
    LinkBroken { vda: u16 },
    #[error("discontiguous file page number at VDA = {vda}")]
    PageNumberMismatch { vda: u16 },
    #[error("differing file serial numbers at VDA = {vda}")]
    SerialMismatch { vda: u16 },
    #[error("short page in the middle of a file at VDA = {vda}")]
    ShortPageInMiddle { vda: u16 },
    #[error("short leader page at VDA = {vda}")]
    LeaderShort { vda: u16 },
    #[error("invalid filename at VDA = {vda}")]
    FilenameInvalid { vda: u16 },
    #[error("directory entry with zero length")]
    DirEntryLengthZero,
    #[error("directory entry too long")]
    DirEntryTooLong,
    #[error("`{name}` is not a directory")]
    NotADirectory { name: String },
    #[error("file not found")]
    NotFound,
    #[error("more than one file matches the name")]
    Ambiguous,
    #[error("name too long")]
    NameTooLong,
    #[error("disk full")]
    DiskFull,
    #[error("operation on a poisoned file cursor")]
    CursorPoisoned,
}

pub type Result<T> = core::result::Result<T, Error>;
