mod guest;
mod region;
