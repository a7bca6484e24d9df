pub mod conv_net;
