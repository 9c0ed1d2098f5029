mod account;
mod evidence;
mod jobs;
mod rate_limit;
mod reaper;
mod summaries;
mod support;
