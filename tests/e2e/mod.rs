mod mixed_batch;
mod restart_resume;
