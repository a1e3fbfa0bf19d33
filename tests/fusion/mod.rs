mod angles;
mod tracking;
