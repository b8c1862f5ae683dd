pub mod ms {
    pub const POLL_INTERVAL: u64 = 100;
    pub const VIEWPORT_SETTLE: u64 = 50;
    pub const CDP_ACTION: u64 = 3000;
    pub const PAGE_LOAD_SETTLE: u64 = 300;
}

pub mod secs {
    pub const CONSENT: u64 = 15;
    pub const CONSENT_SETTLE: u64 = 1;
    pub const SELECT_ALL: u64 = 20;
    pub const EXPORT_MENU: u64 = 20;
    pub const EXPORT_PANEL: u64 = 10;
    pub const EXPORT_OPTION: u64 = 10;
    pub const DOWNLOAD: u64 = 60;
    pub const DOWNLOAD_POLL: u64 = 1;
    pub const RENAME_BACKOFF: u64 = 1;
    pub const NEXT_PAGE: u64 = 20;
    pub const PAGE_LOAD: u64 = 20;
    pub const PAGE_SETTLE: u64 = 2;
    pub const NAVIGATION: u64 = 30;
    pub const REQUEST: u64 = 120;
}

pub const RENAME_ATTEMPTS: u32 = 5;
